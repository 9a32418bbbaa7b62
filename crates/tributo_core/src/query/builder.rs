use crate::geo::RadiusPredicate;
use rusqlite::types::Value;

/// A SQL statement and its positional bind values.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<Value>,
}

/// A single `WHERE` predicate. Values are always bound, never inlined.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    Equals {
        column: &'static str,
        value: Value,
    },
    /// `column >= value`
    AtLeast {
        column: &'static str,
        value: Value,
    },
    /// `column <= value`
    AtMost {
        column: &'static str,
        value: Value,
    },
    /// Unicode case-insensitive substring match. Wildcard characters in
    /// `needle` match literally.
    ContainsInsensitive {
        column: &'static str,
        needle: String,
    },
    /// Great-circle distance from the coordinate columns to the predicate
    /// center is at most its radius. Adds a bounding-box prefilter when one
    /// is well defined.
    WithinRadius {
        longitude_column: &'static str,
        latitude_column: &'static str,
        predicate: RadiusPredicate,
    },
}

impl Clause {
    fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Self::Equals { column, value } => {
                sql.push_str(&format!("{column} = ?"));
                params.push(value.clone());
            }
            Self::AtLeast { column, value } => {
                sql.push_str(&format!("{column} >= ?"));
                params.push(value.clone());
            }
            Self::AtMost { column, value } => {
                sql.push_str(&format!("{column} <= ?"));
                params.push(value.clone());
            }
            Self::ContainsInsensitive { column, needle } => {
                sql.push_str(&format!("instr(fold_case({column}), ?) > 0"));
                params.push(Value::Text(needle.to_lowercase()));
            }
            Self::WithinRadius {
                longitude_column,
                latitude_column,
                predicate,
            } => {
                if let Some(bbox) = predicate.bounding_box() {
                    sql.push_str(&format!(
                        "{longitude_column} BETWEEN ? AND ? AND {latitude_column} BETWEEN ? AND ? AND "
                    ));
                    params.extend([
                        Value::Real(bbox.min_longitude),
                        Value::Real(bbox.max_longitude),
                        Value::Real(bbox.min_latitude),
                        Value::Real(bbox.max_latitude),
                    ]);
                }
                sql.push_str(&format!(
                    "distance_meters({longitude_column}, {latitude_column}, ?, ?) <= ?"
                ));
                let center = predicate.center();
                params.extend([
                    Value::Real(center.longitude()),
                    Value::Real(center.latitude()),
                    Value::Real(predicate.radius_meters()),
                ]);
            }
        }
    }
}

/// Incremental `SELECT` over one table or view.
#[derive(Debug, Clone)]
pub struct SelectQuery {
    source: &'static str,
    extra_columns: Vec<(String, Vec<Value>)>,
    clauses: Vec<Clause>,
    order_by: Vec<&'static str>,
    limit: Option<u32>,
}

impl SelectQuery {
    /// Selects `*` from `source`.
    pub fn from(source: &'static str) -> Self {
        Self {
            source,
            extra_columns: Vec::new(),
            clauses: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Appends a computed column. Its bind values precede all `WHERE` values.
    pub fn column(mut self, expression: impl Into<String>, params: Vec<Value>) -> Self {
        self.extra_columns.push((expression.into(), params));
        self
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Adds the clause only when present.
    pub fn filter_opt(self, clause: Option<Clause>) -> Self {
        match clause {
            Some(clause) => self.filter(clause),
            None => self,
        }
    }

    pub fn order_by(mut self, term: &'static str) -> Self {
        self.order_by.push(term);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn build(&self) -> BuiltQuery {
        let mut sql = String::from("SELECT *");
        let mut params = Vec::new();

        for (expression, column_params) in &self.extra_columns {
            sql.push_str(", ");
            sql.push_str(expression);
            params.extend(column_params.iter().cloned());
        }

        sql.push_str(" FROM ");
        sql.push_str(self.source);

        for (index, clause) in self.clauses.iter().enumerate() {
            sql.push_str(if index == 0 { " WHERE " } else { " AND " });
            clause.render(&mut sql, &mut params);
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));
        }

        BuiltQuery { sql, params }
    }
}

/// One `column = ?` entry of an `UPDATE ... SET` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: &'static str,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: &'static str, value: impl Into<Value>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

/// `UPDATE table SET ... WHERE key_column = ?` built from present fields only.
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table: &'static str,
    assignments: Vec<Assignment>,
    touch_column: Option<&'static str>,
    force_touch: bool,
}

impl UpdateStatement {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
            touch_column: None,
            force_touch: false,
        }
    }

    /// Sets `column` to the current epoch milliseconds whenever the statement
    /// has at least one assignment.
    pub fn touch(mut self, column: &'static str) -> Self {
        self.touch_column = Some(column);
        self
    }

    /// Emits the touch column even without assignments, for rows whose
    /// dependent records changed.
    pub fn force_touch(&mut self) {
        self.force_touch = true;
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.assignments.push(Assignment::new(column, value));
    }

    /// Sets `column` only when `value` is present.
    pub fn set_opt<T: Into<Value>>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.set(column, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Returns `None` when there is nothing to assign or touch.
    pub fn build(&self, key_column: &'static str, key: impl Into<Value>) -> Option<BuiltQuery> {
        let touch_only = self.force_touch && self.touch_column.is_some();
        if self.assignments.is_empty() && !touch_only {
            return None;
        }

        let mut parts = self
            .assignments
            .iter()
            .map(|assignment| format!("{} = ?", assignment.column))
            .collect::<Vec<_>>();
        if let Some(column) = self.touch_column {
            parts.push(format!(
                "{column} = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)"
            ));
        }

        let mut params = self
            .assignments
            .iter()
            .map(|assignment| assignment.value.clone())
            .collect::<Vec<_>>();
        params.push(key.into());

        Some(BuiltQuery {
            sql: format!(
                "UPDATE {} SET {} WHERE {key_column} = ?",
                self.table,
                parts.join(", ")
            ),
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Clause, SelectQuery, UpdateStatement};
    use crate::geo::{make_point, within_radius};
    use rusqlite::types::Value;

    #[test]
    fn no_filters_emit_no_where_clause() {
        let built = SelectQuery::from("predios_completo")
            .order_by("id_predio ASC")
            .build();
        assert_eq!(built.sql, "SELECT * FROM predios_completo ORDER BY id_predio ASC");
        assert!(built.params.is_empty());
    }

    #[test]
    fn clauses_bind_values_in_placeholder_order() {
        let built = SelectQuery::from("predios_completo")
            .filter(Clause::Equals {
                column: "estado_pago",
                value: Value::Text("MOROSO".to_string()),
            })
            .filter(Clause::AtLeast {
                column: "deuda_total",
                value: Value::Real(10.0),
            })
            .filter(Clause::ContainsInsensitive {
                column: "sector",
                needle: "JAY%".to_string(),
            })
            .limit(5)
            .build();

        assert_eq!(
            built.sql,
            "SELECT * FROM predios_completo WHERE estado_pago = ? AND deuda_total >= ? \
             AND instr(fold_case(sector), ?) > 0 LIMIT ?"
        );
        assert_eq!(
            built.params,
            vec![
                Value::Text("MOROSO".to_string()),
                Value::Real(10.0),
                Value::Text("jay%".to_string()),
                Value::Integer(5),
            ]
        );
        assert_eq!(built.sql.matches('?').count(), built.params.len());
    }

    #[test]
    fn computed_column_params_precede_where_params() {
        let center = make_point(Some(-70.0125), Some(-15.8402)).unwrap();
        let predicate = within_radius(center, 500.0).unwrap();
        let built = SelectQuery::from("predios_completo")
            .column(
                "distance_meters(longitud, latitud, ?, ?) AS distancia_metros",
                vec![Value::Real(-70.0125), Value::Real(-15.8402)],
            )
            .filter(Clause::WithinRadius {
                longitude_column: "longitud",
                latitude_column: "latitud",
                predicate,
            })
            .build();

        assert!(built.sql.starts_with("SELECT *, distance_meters(longitud, latitud, ?, ?)"));
        assert!(built.sql.contains("longitud BETWEEN ? AND ? AND latitud BETWEEN ? AND ?"));
        assert_eq!(built.params.len(), 2 + 4 + 3);
        assert_eq!(built.params[0], Value::Real(-70.0125));
        assert_eq!(built.params[1], Value::Real(-15.8402));
        assert_eq!(built.params[8], Value::Real(500.0));
        assert_eq!(built.sql.matches('?').count(), built.params.len());
    }

    #[test]
    fn update_statement_skips_absent_fields() {
        let mut update = UpdateStatement::new("predios").touch("updated_at");
        update.set_opt::<String>("sector", None);
        assert!(update.is_empty());
        assert!(update.build("id_predio", 1_i64).is_none());

        update.set_opt("sector", Some("Centro".to_string()));
        update.set("autovaluo", 1500.5);
        let built = update.build("id_predio", 7_i64).unwrap();
        assert_eq!(
            built.sql,
            "UPDATE predios SET sector = ?, autovaluo = ?, \
             updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000) WHERE id_predio = ?"
        );
        assert_eq!(
            built.params,
            vec![
                Value::Text("Centro".to_string()),
                Value::Real(1500.5),
                Value::Integer(7),
            ]
        );
    }

    #[test]
    fn forced_touch_updates_only_the_timestamp() {
        let mut update = UpdateStatement::new("predios").touch("updated_at");
        update.force_touch();
        let built = update.build("id_predio", 3_i64).unwrap();
        assert_eq!(
            built.sql,
            "UPDATE predios SET updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000) \
             WHERE id_predio = ?"
        );
        assert_eq!(built.params, vec![Value::Integer(3)]);

        let mut untouched = UpdateStatement::new("tributos");
        untouched.force_touch();
        assert!(untouched.build("id_predio", 3_i64).is_none());
    }
}
