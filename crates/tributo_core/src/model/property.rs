//! Property, taxpayer and tax-record write/read shapes.

use crate::geo::{make_point, GeoPoint, GeometryError};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Property identifier (`predios.id_predio`).
pub type PropertyId = i64;

/// Taxpayer identifier (`contribuyentes.id_contribuyente`).
pub type TaxpayerId = i64;

/// Sector assigned when a create request does not name one.
pub const DEFAULT_SECTOR: &str = "Jayllihuaya";

/// Housing type assigned when a create request does not name one.
pub const DEFAULT_HOUSING_TYPE: &str = "Rústica";

/// Payment classification derived by the store from a tax record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Nothing owed.
    AlDia,
    /// Unpaid tax or fee balance.
    Moroso,
    /// No tax or fee assessed.
    Exonerado,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 3] = [Self::AlDia, Self::Moroso, Self::Exonerado];

    /// Storage label (`tributos.estado_pago`).
    pub fn as_db(self) -> &'static str {
        match self {
            Self::AlDia => "AL_DIA",
            Self::Moroso => "MOROSO",
            Self::Exonerado => "EXONERADO",
        }
    }

    /// Parses a storage or request label, ignoring case and surrounding space.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_db() == normalized)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_db())
    }
}

/// Optional filters for property listing. Absent filters emit no predicate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilters {
    /// Exact payment status.
    #[serde(rename = "estado", default)]
    pub status: Option<PaymentStatus>,
    /// Inclusive lower bound on total debt.
    #[serde(rename = "deuda_min", default)]
    pub min_debt: Option<f64>,
    /// Inclusive upper bound on total debt.
    #[serde(rename = "deuda_max", default)]
    pub max_debt: Option<f64>,
    /// Case-insensitive substring of the sector name.
    #[serde(default)]
    pub sector: Option<String>,
}

impl PropertyFilters {
    /// Filters for the delinquent listing.
    pub fn delinquent() -> Self {
        Self {
            status: Some(PaymentStatus::Moroso),
            ..Self::default()
        }
    }

    /// Rejects non-finite debt bounds.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_finite("deuda_min", self.min_debt)?;
        check_finite("deuda_max", self.max_debt)?;
        Ok(())
    }
}

/// Create request: one property, its tax record and its taxpayer (by name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    #[serde(rename = "longitud", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "latitud", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "codigo_catastral")]
    pub cadastral_code: String,
    #[serde(default = "default_sector")]
    pub sector: String,
    #[serde(rename = "tipo_vivienda", default = "default_housing_type")]
    pub housing_type: String,
    #[serde(rename = "autovaluo", default)]
    pub assessed_value: f64,
    #[serde(rename = "numero_vivienda", default)]
    pub house_number: String,
    #[serde(rename = "contribuyente_nombre")]
    pub taxpayer_name: String,
    /// Stored only when the taxpayer is created by this request.
    #[serde(rename = "contribuyente_dni", default)]
    pub taxpayer_national_id: Option<String>,
    /// Stored only when the taxpayer is created by this request.
    #[serde(rename = "contribuyente_telefono", default)]
    pub taxpayer_phone: Option<String>,
    #[serde(rename = "monto_impuesto", default)]
    pub tax_amount: f64,
    #[serde(rename = "pago_impuesto", default)]
    pub tax_paid: bool,
    #[serde(rename = "monto_arbitrios", default)]
    pub fee_amount: f64,
    #[serde(rename = "pago_arbitrios", default)]
    pub fee_paid: bool,
    #[serde(rename = "ingreso_familiar", default)]
    pub household_income: f64,
    #[serde(rename = "cantidad_personas", default = "default_household_size")]
    pub household_size: i64,
    #[serde(rename = "nivel_educativo_jefe", default)]
    pub education_level: Option<String>,
    #[serde(rename = "servicios_basicos", default)]
    pub basic_services: Option<String>,
}

impl PropertyInput {
    /// Builds an input with the documented defaults for every optional field.
    pub fn new(
        cadastral_code: impl Into<String>,
        taxpayer_name: impl Into<String>,
        longitude: f64,
        latitude: f64,
    ) -> Self {
        Self {
            longitude: Some(longitude),
            latitude: Some(latitude),
            cadastral_code: cadastral_code.into(),
            sector: default_sector(),
            housing_type: default_housing_type(),
            assessed_value: 0.0,
            house_number: String::new(),
            taxpayer_name: taxpayer_name.into(),
            taxpayer_national_id: None,
            taxpayer_phone: None,
            tax_amount: 0.0,
            tax_paid: false,
            fee_amount: 0.0,
            fee_paid: false,
            household_income: 0.0,
            household_size: default_household_size(),
            education_level: None,
            basic_services: None,
        }
    }

    /// Validates the request and returns the property location.
    ///
    /// # Errors
    /// - Blank cadastral code, taxpayer name or sector.
    /// - Negative or non-finite amounts, negative household size.
    /// - Missing or invalid coordinates.
    pub fn validate(&self) -> Result<GeoPoint, ValidationError> {
        check_not_blank("codigo_catastral", &self.cadastral_code)?;
        check_not_blank("contribuyente_nombre", &self.taxpayer_name)?;
        check_not_blank("sector", &self.sector)?;
        check_amount("autovaluo", Some(self.assessed_value))?;
        check_amount("monto_impuesto", Some(self.tax_amount))?;
        check_amount("monto_arbitrios", Some(self.fee_amount))?;
        check_amount("ingreso_familiar", Some(self.household_income))?;
        check_count("cantidad_personas", Some(self.household_size))?;
        Ok(make_point(self.longitude, self.latitude)?)
    }
}

/// Partial update. Only fields that are `Some` are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyPatch {
    #[serde(rename = "codigo_catastral")]
    pub cadastral_code: Option<String>,
    pub sector: Option<String>,
    #[serde(rename = "tipo_vivienda")]
    pub housing_type: Option<String>,
    #[serde(rename = "autovaluo")]
    pub assessed_value: Option<f64>,
    #[serde(rename = "numero_vivienda")]
    pub house_number: Option<String>,
    /// Renames the taxpayer linked through this property's tax record.
    #[serde(rename = "contribuyente_nombre")]
    pub taxpayer_name: Option<String>,
    #[serde(rename = "monto_impuesto")]
    pub tax_amount: Option<f64>,
    #[serde(rename = "pago_impuesto")]
    pub tax_paid: Option<bool>,
    #[serde(rename = "monto_arbitrios")]
    pub fee_amount: Option<f64>,
    #[serde(rename = "pago_arbitrios")]
    pub fee_paid: Option<bool>,
    #[serde(rename = "ingreso_familiar")]
    pub household_income: Option<f64>,
    #[serde(rename = "cantidad_personas")]
    pub household_size: Option<i64>,
    #[serde(rename = "nivel_educativo_jefe")]
    pub education_level: Option<String>,
    #[serde(rename = "servicios_basicos")]
    pub basic_services: Option<String>,
    #[serde(rename = "longitud")]
    pub longitude: Option<f64>,
    #[serde(rename = "latitud")]
    pub latitude: Option<f64>,
}

impl PropertyPatch {
    /// Validates present fields and returns the new location, if any.
    ///
    /// # Errors
    /// - A lone longitude or latitude (`IncompleteCoordinates`).
    /// - Blank text for required columns, negative or non-finite numbers.
    pub fn validate(&self) -> Result<Option<GeoPoint>, ValidationError> {
        if let Some(code) = &self.cadastral_code {
            check_not_blank("codigo_catastral", code)?;
        }
        if let Some(sector) = &self.sector {
            check_not_blank("sector", sector)?;
        }
        if let Some(name) = &self.taxpayer_name {
            check_not_blank("contribuyente_nombre", name)?;
        }
        check_amount("autovaluo", self.assessed_value)?;
        check_amount("monto_impuesto", self.tax_amount)?;
        check_amount("monto_arbitrios", self.fee_amount)?;
        check_amount("ingreso_familiar", self.household_income)?;
        check_count("cantidad_personas", self.household_size)?;

        match (self.longitude, self.latitude) {
            (None, None) => Ok(None),
            (Some(_), Some(_)) => Ok(Some(make_point(self.longitude, self.latitude)?)),
            _ => Err(ValidationError::IncompleteCoordinates),
        }
    }
}

/// Confirmation payload of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedProperty {
    #[serde(rename = "id_predio")]
    pub id: PropertyId,
    #[serde(rename = "codigo_catastral")]
    pub cadastral_code: String,
}

/// Input validation error raised before any mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is empty after trimming.
    Blank(&'static str),
    /// Amount or count below zero.
    Negative { field: &'static str, value: f64 },
    /// NaN or infinite number.
    NotFinite(&'static str),
    /// Only one of longitude/latitude was supplied.
    IncompleteCoordinates,
    Geometry(GeometryError),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be empty"),
            Self::Negative { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
            Self::NotFinite(field) => write!(f, "{field} must be a finite number"),
            Self::IncompleteCoordinates => {
                write!(f, "longitud and latitud must be provided together")
            }
            Self::Geometry(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ValidationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Geometry(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GeometryError> for ValidationError {
    fn from(value: GeometryError) -> Self {
        Self::Geometry(value)
    }
}

fn default_sector() -> String {
    DEFAULT_SECTOR.to_string()
}

fn default_housing_type() -> String {
    DEFAULT_HOUSING_TYPE.to_string()
}

fn default_household_size() -> i64 {
    1
}

fn check_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    Ok(())
}

fn check_finite(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    match value {
        Some(value) if !value.is_finite() => Err(ValidationError::NotFinite(field)),
        _ => Ok(()),
    }
}

fn check_amount(field: &'static str, value: Option<f64>) -> Result<(), ValidationError> {
    check_finite(field, value)?;
    match value {
        Some(value) if value < 0.0 => Err(ValidationError::Negative { field, value }),
        _ => Ok(()),
    }
}

fn check_count(field: &'static str, value: Option<i64>) -> Result<(), ValidationError> {
    match value {
        Some(value) if value < 0 => Err(ValidationError::Negative {
            field,
            value: value as f64,
        }),
        _ => Ok(()),
    }
}
