//! Command-line front end for the property tax API.
//!
//! Every subcommand prints one JSON document on stdout. API failures print
//! the `{error, status, message}` envelope on stderr and exit with 1;
//! configuration failures exit with 2 and encoding failures with 3.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tributo_api::{Api, ApiError, ApiResult};
use tributo_core::{
    init_logging, ConfigError, PaymentStatus, PropertyFilters, PropertyInput, PropertyPatch,
    StoreConfig,
};

#[derive(Parser)]
#[command(name = "tributo")]
#[command(about = "Municipal property tax store with GeoJSON output")]
struct Cli {
    /// SQLite database file; overrides TRIBUTO_DB_PATH
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Service descriptor
    Root,

    /// Database reachability
    Health,

    /// List properties, highest debt first
    List {
        /// AL_DIA, MOROSO or EXONERADO
        #[arg(long)]
        estado: Option<String>,
        #[arg(long)]
        deuda_min: Option<f64>,
        #[arg(long)]
        deuda_max: Option<f64>,
        #[arg(long)]
        sector: Option<String>,
    },

    /// Delinquent properties
    Morosos,

    /// Case-insensitive search by taxpayer name
    Buscar {
        #[arg(long)]
        nombre: String,
    },

    /// Properties within a radius of a point
    Radio {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        /// Meters; defaults to TRIBUTO_DEFAULT_RADIUS_M
        #[arg(long)]
        radius: Option<f64>,
    },

    /// Closest properties to a point
    Cercanos {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,
        #[arg(long, allow_hyphen_values = true)]
        lng: f64,
        #[arg(long)]
        limite: Option<u32>,
    },

    /// Municipality-wide statistics
    Estadisticas,

    /// Per-sector breakdown
    Sectores,

    /// Read one property
    Obtener {
        #[arg(long)]
        id: i64,
    },

    /// Create a property from a JSON document
    Crear {
        #[arg(long)]
        json: String,
    },

    /// Apply a partial JSON update to a property
    Actualizar {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        json: String,
    },

    /// Delete a property and its tax record
    Eliminar {
        #[arg(long)]
        id: i64,
    },
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(body) => {
            println!("{body}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            err.report();
            ExitCode::from(err.exit_code())
        }
    }
}

/// Failure of one invocation.
#[derive(Debug)]
enum CliError {
    /// The API refused or failed the request.
    Api(ApiError),
    /// Environment configuration could not be resolved.
    Config(ConfigError),
    /// A successful response could not be encoded.
    Encode(serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Api(_) => 1,
            Self::Config(_) => 2,
            Self::Encode(_) => 3,
        }
    }

    /// API failures keep the JSON envelope; the others are plain text.
    fn report(&self) {
        match self {
            Self::Api(err) => match serde_json::to_string(err) {
                Ok(body) => eprintln!("{body}"),
                Err(_) => eprintln!("{err}"),
            },
            Self::Config(err) => eprintln!("configuration error: {err}"),
            Self::Encode(err) => eprintln!("response encoding failed: {err}"),
        }
    }
}

impl From<ApiError> for CliError {
    fn from(value: ApiError) -> Self {
        Self::Api(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Encode(value)
    }
}

fn run(cli: Cli) -> Result<String, CliError> {
    let config = StoreConfig::from_env()?;
    let config = match cli.db {
        Some(path) => config.with_db_path(path),
        None => config,
    };

    if let Some(dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, &dir.to_string_lossy()) {
            eprintln!("logging disabled: {err}");
        }
    }

    let api = Api::new(config);
    match cli.command {
        Command::Root => render(Ok(api.root())),
        Command::Health => render(Ok(api.health())),
        Command::List {
            estado,
            deuda_min,
            deuda_max,
            sector,
        } => {
            let filters = parse_filters(estado, deuda_min, deuda_max, sector)?;
            render(api.list_properties(filters))
        }
        Command::Morosos => render(api.list_delinquent()),
        Command::Buscar { nombre } => render(api.search_by_taxpayer_name(&nombre)),
        Command::Radio { lat, lng, radius } => render(api.search_by_radius(lat, lng, radius)),
        Command::Cercanos { lat, lng, limite } => {
            render(api.nearest_properties(lat, lng, limite))
        }
        Command::Estadisticas => render(api.statistics()),
        Command::Sectores => render(api.sectors()),
        Command::Obtener { id } => render(api.get_property(id)),
        Command::Crear { json } => {
            let input = parse_json::<PropertyInput>(&json)?;
            render(api.create_property(&input))
        }
        Command::Actualizar { id, json } => {
            let patch = parse_json::<PropertyPatch>(&json)?;
            render(api.update_property(id, &patch))
        }
        Command::Eliminar { id } => render(api.delete_property(id)),
    }
}

fn render<T: Serialize>(result: ApiResult<T>) -> Result<String, CliError> {
    let value = result?;
    Ok(serde_json::to_string_pretty(&value)?)
}

/// Malformed request bodies are caller input errors.
fn parse_json<T: serde::de::DeserializeOwned>(raw: &str) -> ApiResult<T> {
    serde_json::from_str(raw).map_err(|err| ApiError::validation(format!("invalid JSON body: {err}")))
}

fn parse_filters(
    estado: Option<String>,
    min_debt: Option<f64>,
    max_debt: Option<f64>,
    sector: Option<String>,
) -> ApiResult<PropertyFilters> {
    let status = match estado {
        Some(raw) => Some(PaymentStatus::parse(&raw).ok_or_else(|| {
            ApiError::validation(format!("estado must be AL_DIA, MOROSO or EXONERADO, got `{raw}`"))
        })?),
        None => None,
    };
    Ok(PropertyFilters {
        status,
        min_debt,
        max_debt,
        sector,
    })
}
