//! Taxpayer lookup, creation and renaming.
//!
//! Taxpayers are matched by exact name. Names are not unique in storage; when
//! several rows share a name the oldest one wins.

use super::RepoResult;
use crate::model::property::{PropertyId, TaxpayerId};
use rusqlite::{params, Connection, OptionalExtension};

/// Outcome of [`SqliteTaxpayerRepository::find_or_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxpayerRef {
    pub id: TaxpayerId,
    pub created: bool,
}

pub struct SqliteTaxpayerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaxpayerRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn find_by_name(&self, name: &str) -> RepoResult<Option<TaxpayerId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id_contribuyente
                 FROM contribuyentes
                 WHERE nombres = ?1
                 ORDER BY id_contribuyente ASC
                 LIMIT 1;",
                [name],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Reuses the taxpayer with exactly this name, or creates one.
    ///
    /// `national_id` and `phone` are only stored on creation; an existing
    /// taxpayer's contact data is left untouched.
    pub fn find_or_create(
        &self,
        name: &str,
        national_id: Option<&str>,
        phone: Option<&str>,
    ) -> RepoResult<TaxpayerRef> {
        if let Some(id) = self.find_by_name(name)? {
            return Ok(TaxpayerRef { id, created: false });
        }

        self.conn.execute(
            "INSERT INTO contribuyentes (nombres, dni, telefono) VALUES (?1, ?2, ?3);",
            params![name, national_id, phone],
        )?;
        Ok(TaxpayerRef {
            id: self.conn.last_insert_rowid(),
            created: true,
        })
    }

    /// Taxpayer linked to a property through its tax record.
    pub fn find_for_property(&self, property_id: PropertyId) -> RepoResult<Option<TaxpayerId>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id_contribuyente FROM tributos WHERE id_predio = ?1;",
                [property_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Number of tax records referencing the taxpayer.
    pub fn linked_property_count(&self, id: TaxpayerId) -> RepoResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM tributos WHERE id_contribuyente = ?1;",
            [id],
            |row| row.get(0),
        )?)
    }

    /// Renames the taxpayer row. Every property linked to it sees the change.
    pub fn rename(&self, id: TaxpayerId, name: &str) -> RepoResult<usize> {
        Ok(self.conn.execute(
            "UPDATE contribuyentes SET nombres = ?1 WHERE id_contribuyente = ?2;",
            params![name, id],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteTaxpayerRepository;
    use crate::db::open_db_in_memory;

    #[test]
    fn find_or_create_reuses_exact_name_only() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteTaxpayerRepository::new(&conn);

        let first = repo
            .find_or_create("Ana Quispe", Some("40123456"), None)
            .unwrap();
        assert!(first.created);

        let again = repo.find_or_create("Ana Quispe", Some("99999999"), None).unwrap();
        assert_eq!(again.id, first.id);
        assert!(!again.created);

        let other = repo.find_or_create("ana quispe", None, None).unwrap();
        assert_ne!(other.id, first.id);

        let dni: Option<String> = conn
            .query_row(
                "SELECT dni FROM contribuyentes WHERE id_contribuyente = ?1;",
                [first.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(dni.as_deref(), Some("40123456"));
    }

    #[test]
    fn rename_updates_the_row() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteTaxpayerRepository::new(&conn);
        let taxpayer = repo.find_or_create("Ana Quispe", None, None).unwrap();

        assert_eq!(repo.rename(taxpayer.id, "Ana Q. Mamani").unwrap(), 1);
        assert_eq!(repo.find_by_name("Ana Quispe").unwrap(), None);
        assert_eq!(repo.find_by_name("Ana Q. Mamani").unwrap(), Some(taxpayer.id));
        assert_eq!(repo.linked_property_count(taxpayer.id).unwrap(), 0);
    }
}
