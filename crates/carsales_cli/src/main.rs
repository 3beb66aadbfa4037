//! Terminal front-end for the car sales record store.
//!
//! # Responsibility
//! - Map subcommands onto `RecordService` use cases.
//! - Resolve configuration from `.env`, environment and flags, in that order.

use carsales_core::{
    init_logging, BackendKind, Record, RecordBackend, RecordField, RecordInput, RecordService,
    SearchField, ServiceError, StoreConfig,
};
use clap::{Parser, Subcommand, ValueEnum};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "carsales")]
#[command(about = "Car sales data management", long_about = None)]
struct Cli {
    /// Storage backend (overrides CARSALES_BACKEND)
    #[arg(long, value_enum, global = true)]
    backend: Option<BackendArg>,
    /// Data file for csv/sqlite backends (overrides CARSALES_DATA_FILE)
    #[arg(long, global = true)]
    file: Option<PathBuf>,
    /// Spreadsheet id for the sheets backend (overrides CARSALES_SHEET_ID)
    #[arg(long, global = true)]
    sheet_id: Option<String>,
    /// Absolute directory for rolling logs (overrides CARSALES_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    /// Log level (overrides CARSALES_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Csv,
    Xlsx,
    Sqlite,
    Sheets,
}

#[derive(Clone, Copy, ValueEnum)]
enum LookupBy {
    Name,
    Chassis,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every customer record
    List {
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Look up customers by name or chassis number
    Lookup {
        #[arg(long, value_enum, default_value = "name")]
        by: LookupBy,
        query: String,
    },
    /// Add a new customer sale
    Add {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        model: String,
        #[arg(long)]
        chassis: String,
        #[arg(long)]
        sold_for: String,
        /// Selling date, defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Delete the record with a chassis number
    Delete {
        chassis: String,
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
    /// Edit the record with a chassis number
    ///
    /// Omitted fields keep their stored value, which must itself be valid;
    /// pass the matching flag to replace an empty or malformed stored value.
    Edit {
        chassis: String,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        new_chassis: Option<String>,
        #[arg(long)]
        sold_for: Option<String>,
        #[arg(long)]
        date: Option<String>,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, log_dir)?;
    }

    let service = RecordService::new(config.open_backend()?);
    let outcome = dispatch(&service, cli.command);
    if let Err(err) = service.close() {
        log::warn!("event=backend_close module=cli status=error error={}", err);
    }
    outcome
}

fn resolve_config(cli: &Cli) -> Result<StoreConfig, Box<dyn Error>> {
    let mut config = StoreConfig::from_env()?;
    if let Some(backend) = cli.backend {
        config.backend = match backend {
            BackendArg::Csv => BackendKind::Csv,
            BackendArg::Xlsx => BackendKind::Xlsx,
            BackendArg::Sqlite => BackendKind::Sqlite,
            BackendArg::Sheets => BackendKind::Sheets,
        };
    }
    if let Some(file) = &cli.file {
        config.data_file = Some(file.clone());
    }
    if let Some(sheet_id) = &cli.sheet_id {
        config.sheet_id = Some(sheet_id.clone());
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config.validate()?;
    Ok(config)
}

fn dispatch<B: RecordBackend>(
    service: &RecordService<B>,
    command: Commands,
) -> Result<(), Box<dyn Error>> {
    match command {
        Commands::List { json } => cmd_list(service, json),
        Commands::Lookup { by, query } => cmd_lookup(service, by, &query),
        Commands::Add {
            customer,
            model,
            chassis,
            sold_for,
            date,
        } => {
            let input = RecordInput {
                customer_name: customer,
                car_model: model,
                chassis_number: chassis,
                sold_for,
                selling_date: date
                    .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string()),
            };
            let record = service.add_record(&input)?;
            println!("Customer details added successfully!");
            print_record(&record);
            Ok(())
        }
        Commands::Delete { chassis, yes } => cmd_delete(service, &chassis, yes),
        Commands::Edit {
            chassis,
            customer,
            model,
            new_chassis,
            sold_for,
            date,
        } => {
            let matches = service.lookup(SearchField::ChassisNumber, &chassis)?;
            let Some(current) = matches.first() else {
                return Err(ServiceError::NotFound(chassis.trim().to_string()).into());
            };
            let changes = EditChanges {
                customer,
                model,
                chassis: new_chassis,
                sold_for,
                date,
            };
            let (input, untouched) = changes.apply(&current.record);

            let record = service
                .edit_by_chassis(&chassis, &input)
                .map_err(|err| explain_edit_error(err, &untouched))?;
            println!("Changes saved. Customer details updated successfully!");
            print_record(&record);
            Ok(())
        }
    }
}

/// Field overrides given to `edit`; `None` keeps the stored value.
#[derive(Debug, Default)]
struct EditChanges {
    customer: Option<String>,
    model: Option<String>,
    chassis: Option<String>,
    sold_for: Option<String>,
    date: Option<String>,
}

impl EditChanges {
    /// Merges the overrides into `current`, returning the fields left untouched.
    fn apply(self, current: &Record) -> (RecordInput, Vec<RecordField>) {
        let mut input = current.to_input();
        let mut untouched = Vec::new();
        let overrides = [
            (RecordField::CustomerName, self.customer),
            (RecordField::CarModel, self.model),
            (RecordField::ChassisNumber, self.chassis),
            (RecordField::SoldFor, self.sold_for),
            (RecordField::SellingDate, self.date),
        ];
        for (field, value) in overrides {
            let Some(value) = value else {
                untouched.push(field);
                continue;
            };
            match field {
                RecordField::CustomerName => input.customer_name = value,
                RecordField::CarModel => input.car_model = value,
                RecordField::ChassisNumber => input.chassis_number = value,
                RecordField::SoldFor => input.sold_for = value,
                RecordField::SellingDate => input.selling_date = value,
            }
        }
        (input, untouched)
    }
}

fn edit_flag(field: RecordField) -> &'static str {
    match field {
        RecordField::CustomerName => "--customer",
        RecordField::CarModel => "--model",
        RecordField::ChassisNumber => "--new-chassis",
        RecordField::SoldFor => "--sold-for",
        RecordField::SellingDate => "--date",
    }
}

/// Points at the flag to pass when a stored value the user kept is invalid.
fn explain_edit_error(err: ServiceError, untouched: &[RecordField]) -> Box<dyn Error> {
    let field = match &err {
        ServiceError::Validation(validation) => validation.field(),
        _ => None,
    };
    match field {
        Some(field) if untouched.contains(&field) => format!(
            "stored `{field}` was kept but is not valid ({err}); pass {} to replace it",
            edit_flag(field)
        )
        .into(),
        _ => err.into(),
    }
}

fn cmd_list<B: RecordBackend>(
    service: &RecordService<B>,
    json: bool,
) -> Result<(), Box<dyn Error>> {
    let table = service.list_all()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }
    if table.is_empty() {
        println!("No customer data available.");
        return Ok(());
    }
    for record in &table {
        print_record(record);
    }
    Ok(())
}

fn cmd_lookup<B: RecordBackend>(
    service: &RecordService<B>,
    by: LookupBy,
    query: &str,
) -> Result<(), Box<dyn Error>> {
    let field = match by {
        LookupBy::Name => SearchField::CustomerName,
        LookupBy::Chassis => SearchField::ChassisNumber,
    };
    let matches = service.lookup(field, query)?;
    if matches.is_empty() {
        println!("No matching records found.");
        return Ok(());
    }
    for hit in &matches {
        print_record(&hit.record);
    }
    Ok(())
}

fn cmd_delete<B: RecordBackend>(
    service: &RecordService<B>,
    chassis: &str,
    confirmed: bool,
) -> Result<(), Box<dyn Error>> {
    if !confirmed {
        let matches = service.preview_delete(chassis)?;
        if matches.is_empty() {
            return Err(ServiceError::NotFound(chassis.trim().to_string()).into());
        }
        println!("Matching record:");
        for record in &matches {
            print_record(record);
        }
        println!("Re-run with --yes to confirm deletion.");
        return Ok(());
    }

    service.delete_record(chassis)?;
    println!(
        "Record with chassis number '{}' deleted successfully!",
        chassis.trim().to_uppercase()
    );
    Ok(())
}

fn print_record(record: &Record) {
    println!("---");
    println!("Customer Name:  {}", record.customer_name);
    println!("Car Model:      {}", record.car_model);
    println!("Chassis Number: {}", record.chassis_number);
    println!("Sold For:       {}", record.sold_for);
    println!("Selling Date:   {}", record.selling_date);
}

#[cfg(test)]
mod tests {
    use super::{explain_edit_error, EditChanges};
    use carsales_core::{Record, RecordField, ServiceError, StorageError, ValidationError};

    fn short_row_record() -> Record {
        Record::new("Bob", "Corolla", "CH002", "", "")
    }

    #[test]
    fn edit_keeps_omitted_fields_and_reports_them_untouched() {
        let changes = EditChanges {
            customer: Some("Robert".to_string()),
            sold_for: Some("6000".to_string()),
            ..EditChanges::default()
        };
        let (input, untouched) = changes.apply(&short_row_record());

        assert_eq!(input.customer_name, "Robert");
        assert_eq!(input.car_model, "Corolla");
        assert_eq!(input.sold_for, "6000");
        assert_eq!(
            untouched,
            vec![
                RecordField::CarModel,
                RecordField::ChassisNumber,
                RecordField::SellingDate
            ]
        );
    }

    #[test]
    fn invalid_kept_value_names_the_flag_to_pass() {
        let err = ServiceError::Validation(ValidationError::InvalidDate(String::new()));
        let message = explain_edit_error(err, &[RecordField::SellingDate]).to_string();
        assert!(message.contains("Selling Date"));
        assert!(message.contains("--date"));
    }

    #[test]
    fn errors_on_supplied_fields_pass_through() {
        let err = ServiceError::Validation(ValidationError::InvalidSoldFor("x".to_string()));
        let message = explain_edit_error(err, &[RecordField::SellingDate]).to_string();
        assert!(!message.contains("--sold-for"));

        let err = ServiceError::Storage(StorageError::Unreachable("offline".to_string()));
        let message = explain_edit_error(err, &[RecordField::SoldFor]).to_string();
        assert!(message.contains("offline"));
    }
}
