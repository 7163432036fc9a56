use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use log::debug;
use serde::Deserialize;

use courier_core::provider::Provider;
use courier_core::resource::{Resource, ResourceId, State, Value};
use courier_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use courier_provider_aws::resources::resource_types;
use courier_provider_aws::schemas::{self, topic_rule_destination::RESOURCE_TYPE};
use courier_provider_aws::utils::parse_arn;
use courier_provider_aws::{IotProvider, ProviderConfig};

#[derive(Parser)]
#[command(name = "courier")]
#[command(about = "Manage AWS IoT topic rule destinations", long_about = None)]
struct Cli {
    /// AWS region (overrides the provider block of the resource file)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Seconds to wait for a new destination to become ENABLED
    #[arg(long, global = true)]
    create_timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a resource file without calling AWS
    Validate {
        /// Path to the JSON resource file
        #[arg(default_value = "destination.json")]
        file: PathBuf,
    },
    /// Create the destination described by a resource file
    Create {
        /// Path to the JSON resource file
        #[arg(default_value = "destination.json")]
        file: PathBuf,

        /// Resource name (overrides the name in the file)
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the observed state of a destination
    Read {
        /// Destination ARN
        arn: String,
    },
    /// Adopt an existing destination and print its state
    Import {
        /// Destination ARN
        arn: String,
    },
    /// Delete a destination
    Delete {
        /// Destination ARN
        arn: String,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Show the schemas of the supported resource types
    Schema,
}

/// Settings given on the command line
struct GlobalArgs {
    region: Option<String>,
    create_timeout: Option<u64>,
}

/// JSON resource file
///
/// ```json
/// {
///   "name": "webhook",
///   "provider": { "region": "us-east-1" },
///   "attributes": { "http": { "confirmation_url": "https://example.com/iot" } }
/// }
/// ```
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ResourceFile {
    #[serde(rename = "type", default = "default_resource_type")]
    resource_type: String,
    name: Option<String>,
    #[serde(default)]
    provider: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

fn default_resource_type() -> String {
    RESOURCE_TYPE.to_string()
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let args = GlobalArgs {
        region: cli.region,
        create_timeout: cli.create_timeout,
    };

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file, &args),
        Commands::Create { file, name } => run_create(&file, name, &args).await,
        Commands::Read { arn } => run_read(&arn, &args).await,
        Commands::Import { arn } => run_import(&arn, &args).await,
        Commands::Delete { arn, auto_approve } => run_delete(&arn, auto_approve, &args).await,
        Commands::Schema => run_schema(),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_validate(file: &PathBuf, args: &GlobalArgs) -> Result<(), String> {
    let parsed = load_resource_file(file)?;
    let resource = to_resource(&parsed, None, file)?;

    println!("{}", "Validating...".cyan());

    validate_resource(&resource)?;
    if !parsed.provider.is_empty() || args.region.is_some() {
        provider_config(&parsed.provider, args)?;
    }

    println!(
        "{}",
        format!("✓ {} validated successfully.", resource.id)
            .green()
            .bold()
    );

    Ok(())
}

async fn run_create(file: &PathBuf, name: Option<String>, args: &GlobalArgs) -> Result<(), String> {
    let parsed = load_resource_file(file)?;
    let resource = to_resource(&parsed, name, file)?;
    validate_resource(&resource)?;

    let config = provider_config(&parsed.provider, args)?;
    println!(
        "{}",
        format!(
            "Creating {} (waiting up to {}s for ENABLED)...",
            resource.id,
            config.create_timeout.as_secs()
        )
        .cyan()
    );

    let provider = build_provider(config).await;
    let state = provider
        .create(&resource)
        .await
        .map_err(|e| e.to_string())?;

    println!("  {} {}", "✓".green(), resource.id);
    print_state(&state);
    Ok(())
}

async fn run_read(arn: &str, args: &GlobalArgs) -> Result<(), String> {
    let provider = build_provider(provider_config(&Default::default(), args)?).await;
    let id = ResourceId::new(RESOURCE_TYPE, resource_name_from_arn(arn));

    let state = provider
        .read(&id, Some(arn))
        .await
        .map_err(|e| e.to_string())?;

    if !state.exists {
        println!("{}", format!("{} does not exist.", arn).yellow());
        return Ok(());
    }
    print_state(&state);
    Ok(())
}

async fn run_import(arn: &str, args: &GlobalArgs) -> Result<(), String> {
    let provider = build_provider(provider_config(&Default::default(), args)?).await;
    let id = ResourceId::new(RESOURCE_TYPE, resource_name_from_arn(arn));

    let state = provider
        .import(&id, arn)
        .await
        .map_err(|e| e.to_string())?;

    println!("  {} Imported {}", "✓".green(), id);
    print_state(&state);
    Ok(())
}

async fn run_delete(arn: &str, auto_approve: bool, args: &GlobalArgs) -> Result<(), String> {
    let config = provider_config(&Default::default(), args)?;
    let id = ResourceId::new(RESOURCE_TYPE, resource_name_from_arn(arn));

    if !auto_approve {
        println!(
            "{}",
            format!("Do you really want to delete {}?", arn)
                .yellow()
                .bold()
        );
        println!(
            "  {}",
            "This action cannot be undone. Type 'yes' to confirm.".yellow()
        );
        print!("\n  Enter a value: ");
        std::io::Write::flush(&mut std::io::stdout()).map_err(|e| e.to_string())?;

        let mut input = String::new();
        std::io::stdin()
            .read_line(&mut input)
            .map_err(|e| e.to_string())?;

        if input.trim() != "yes" {
            println!();
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
        println!();
    }

    let provider = build_provider(config).await;
    match provider.delete(&id, arn).await {
        Ok(()) => {
            println!("  {} {} {}", "✓".green(), "-".red().bold(), id);
            println!("{}", "Delete complete!".green().bold());
            Ok(())
        }
        Err(e) => {
            println!("  {} {} {}", "✗".red(), "-".red().bold(), id);
            Err(e.to_string())
        }
    }
}

fn run_schema() -> Result<(), String> {
    for schema in schemas::all_schemas() {
        println!("{}", schema.resource_type.bold());
        if let Some(description) = &schema.description {
            println!("  {}", description);
        }
        for line in describe_attributes(&schema) {
            println!("  {}", line);
        }
        for group in &schema.exactly_one_of {
            println!("  exactly one of: {}", group.join(", "));
        }
    }
    Ok(())
}

/// One line per attribute, nested block attributes as `block.attribute`
fn describe_attributes(schema: &ResourceSchema) -> Vec<String> {
    let mut attributes: Vec<&AttributeSchema> = schema.attributes.values().collect();
    attributes.sort_by(|a, b| a.name.cmp(&b.name));

    let mut lines = Vec::new();
    for attr in attributes {
        describe_attribute(&attr.name, attr, &mut lines);
    }
    lines
}

fn describe_attribute(path: &str, attr: &AttributeSchema, lines: &mut Vec<String>) {
    let mut flags = Vec::new();
    if attr.required {
        flags.push("required");
    }
    if attr.computed {
        flags.push("computed");
    }
    if attr.force_new {
        flags.push("force new");
    }
    let api_name = attr
        .provider_name
        .as_deref()
        .map(|name| format!(" ({})", name))
        .unwrap_or_default();

    lines.push(format!(
        "{}{} {} {}",
        path.cyan(),
        api_name,
        format!("[{}]", flags.join(", ")).dimmed(),
        attr.description.as_deref().unwrap_or("")
    ));

    if let AttributeType::Block { attributes, .. } = &attr.attr_type {
        for nested in attributes {
            describe_attribute(&format!("{}.{}", path, nested.name), nested, lines);
        }
    }
}

fn load_resource_file(file: &Path) -> Result<ResourceFile, String> {
    let content = fs::read_to_string(file)
        .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
    serde_json::from_str(&content).map_err(|e| format!("Parse error in {}: {}", file.display(), e))
}

/// Build the resource; the name falls back to the file stem
fn to_resource(parsed: &ResourceFile, name: Option<String>, file: &Path) -> Result<Resource, String> {
    let name = name
        .or_else(|| parsed.name.clone())
        .or_else(|| {
            file.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .ok_or_else(|| format!("Cannot determine resource name for {}", file.display()))?;

    let mut resource = Resource::new(parsed.resource_type.clone(), name);
    resource.attributes = json_attributes(&parsed.attributes);
    Ok(resource)
}

fn json_attributes(map: &serde_json::Map<String, serde_json::Value>) -> HashMap<String, Value> {
    map.iter()
        .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
        .collect()
}

fn validate_resource(resource: &Resource) -> Result<(), String> {
    let schema = find_schema(&resource.id.resource_type)?;
    schema.validate(&resource.attributes).map_err(|errors| {
        let lines: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
        format!("{} is invalid:\n{}", resource.id, lines.join("\n"))
    })
}

fn find_schema(resource_type: &str) -> Result<ResourceSchema, String> {
    resource_types()
        .into_iter()
        .find(|t| t.name() == resource_type)
        .map(|t| t.schema())
        .ok_or_else(|| format!("Unknown resource type: {}", resource_type))
}

/// Merge the file's provider block with command line overrides
fn provider_config(
    block: &serde_json::Map<String, serde_json::Value>,
    args: &GlobalArgs,
) -> Result<ProviderConfig, String> {
    let mut attributes = json_attributes(block);
    if let Some(region) = &args.region {
        attributes.insert("region".to_string(), Value::String(region.clone()));
    }
    if let Some(timeout) = args.create_timeout {
        let timeout = i64::try_from(timeout)
            .map_err(|_| format!("--create-timeout is too large: {}", timeout))?;
        attributes.insert("create_timeout".to_string(), Value::Int(timeout));
    }
    if !attributes.contains_key("region") {
        return Err("No region configured: pass --region or set provider.region".to_string());
    }

    let config = ProviderConfig::from_attributes(&attributes).map_err(|e| e.to_string())?;
    debug!("Provider configuration: {:?}", config);
    Ok(config)
}

async fn build_provider(config: ProviderConfig) -> Box<dyn Provider> {
    Box::new(IotProvider::new(config).await)
}

/// Last segment of the ARN resource, e.g. the destination UUID
fn resource_name_from_arn(arn: &str) -> String {
    parse_arn(arn)
        .and_then(|arn| arn.resource.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or(arn)
        .to_string()
}

fn print_state(state: &State) {
    if let Some(identifier) = &state.identifier {
        println!("{}: {}", "identifier".bold(), identifier);
    }
    let attributes: serde_json::Map<String, serde_json::Value> = state
        .attributes
        .iter()
        .map(|(k, v)| (k.clone(), v.to_json()))
        .collect();
    match serde_json::to_string_pretty(&serde_json::Value::Object(attributes)) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("{} {}", "Failed to render state:".red(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn no_args() -> GlobalArgs {
        GlobalArgs {
            region: None,
            create_timeout: None,
        }
    }

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_http_resource_file() {
        let file = write_file(
            r#"{
                "name": "webhook",
                "provider": { "region": "us-east-1" },
                "attributes": { "http": { "confirmation_url": "https://example.com/iot" } }
            }"#,
        );

        let parsed = load_resource_file(file.path()).unwrap();
        let resource = to_resource(&parsed, None, file.path()).unwrap();

        assert_eq!(resource.id, ResourceId::new(RESOURCE_TYPE, "webhook"));
        assert!(validate_resource(&resource).is_ok());
        let config = provider_config(&parsed.provider, &no_args()).unwrap();
        assert_eq!(config.region, "us-east-1");
    }

    #[test]
    fn name_flag_overrides_file() {
        let file = write_file(r#"{ "name": "webhook", "attributes": {} }"#);
        let parsed = load_resource_file(file.path()).unwrap();

        let resource = to_resource(&parsed, Some("other".to_string()), file.path()).unwrap();
        assert_eq!(resource.id.name, "other");
    }

    #[test]
    fn name_falls_back_to_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("private-vpc.json");
        fs::write(&path, r#"{ "attributes": {} }"#).unwrap();

        let parsed = load_resource_file(&path).unwrap();
        let resource = to_resource(&parsed, None, &path).unwrap();
        assert_eq!(resource.id.name, "private-vpc");
    }

    #[test]
    fn invalid_resource_lists_every_error() {
        let file = write_file(
            r#"{
                "name": "private",
                "attributes": {
                    "arn": "arn:aws:iot:us-east-1:123456789012:ruledestination/vpc/1",
                    "vpc": {
                        "role_arn": "arn:aws:iam::123456789012:role/iot-vpc",
                        "vpc_id": "vpc-123"
                    }
                }
            }"#,
        );
        let parsed = load_resource_file(file.path()).unwrap();
        let resource = to_resource(&parsed, None, file.path()).unwrap();

        let err = validate_resource(&resource).unwrap_err();
        assert!(err.starts_with("iot.topic_rule_destination.private is invalid:"));
        assert!(err.contains("Attribute 'arn' is computed and cannot be set"));
        assert!(err.contains("In block 'vpc': Required attribute 'subnet_ids' is missing"));
    }

    #[test]
    fn unknown_fields_and_types_are_rejected() {
        let file = write_file(r#"{ "name": "x", "attrs": {} }"#);
        assert!(load_resource_file(file.path()).is_err());

        let file = write_file(r#"{ "type": "iot.thing", "name": "x" }"#);
        let parsed = load_resource_file(file.path()).unwrap();
        let resource = to_resource(&parsed, None, file.path()).unwrap();
        assert_eq!(
            validate_resource(&resource).unwrap_err(),
            "Unknown resource type: iot.thing"
        );
    }

    #[test]
    fn null_attributes_are_dropped() {
        let file = write_file(r#"{ "name": "x", "attributes": { "vpc": null } }"#);
        let parsed = load_resource_file(file.path()).unwrap();
        let resource = to_resource(&parsed, None, file.path()).unwrap();
        assert!(resource.attributes.is_empty());
    }

    #[test]
    fn command_line_overrides_provider_block() {
        let file = write_file(
            r#"{ "provider": { "region": "us-east-1", "create_timeout": 60 }, "attributes": {} }"#,
        );
        let parsed = load_resource_file(file.path()).unwrap();
        let args = GlobalArgs {
            region: Some("eu-west-1".to_string()),
            create_timeout: Some(120),
        };

        let config = provider_config(&parsed.provider, &args).unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.create_timeout, Duration::from_secs(120));
    }

    #[test]
    fn fractional_timeout_is_rejected() {
        let file = write_file(
            r#"{ "provider": { "region": "us-east-1", "create_timeout": 1.9 }, "attributes": {} }"#,
        );
        let parsed = load_resource_file(file.path()).unwrap();

        let err = provider_config(&parsed.provider, &no_args()).unwrap_err();
        assert!(err.starts_with("Invalid provider configuration: Type mismatch"));
    }

    #[test]
    fn regions_outside_the_commercial_partition_are_accepted() {
        for region in ["ap-east-1", "cn-north-1", "us-gov-west-1"] {
            let args = GlobalArgs {
                region: Some(region.to_string()),
                create_timeout: None,
            };
            let config = provider_config(&Default::default(), &args).unwrap();
            assert_eq!(config.region, region);
        }
    }

    #[test]
    fn region_is_required() {
        let err = provider_config(&Default::default(), &no_args()).unwrap_err();
        assert!(err.starts_with("No region configured"));
    }

    #[test]
    fn schema_description_lists_nested_attributes_with_api_names() {
        let lines = describe_attributes(&find_schema(RESOURCE_TYPE).unwrap());

        let line = |api_name: &str| {
            lines
                .iter()
                .find(|l| l.contains(&format!("({})", api_name)))
                .cloned()
                .unwrap_or_else(|| panic!("no line for {}", api_name))
        };
        assert!(line("HttpUrlConfiguration").contains("http"));
        assert!(line("ConfirmationUrl").contains("http.confirmation_url"));
        assert!(line("SubnetIds").contains("vpc.subnet_ids"));
        assert!(line("SubnetIds").contains("required"));
        assert!(line("Arn").contains("computed"));
        assert_eq!(lines.len(), 9);
    }

    #[test]
    fn resource_name_uses_arn_suffix() {
        assert_eq!(
            resource_name_from_arn(
                "arn:aws:iot:us-east-1:123456789012:ruledestination/vpc/2ce781c8-68a6-4c52-9c62-63fe489ecc60"
            ),
            "2ce781c8-68a6-4c52-9c62-63fe489ecc60"
        );
        assert_eq!(resource_name_from_arn("not-an-arn"), "not-an-arn");
    }
}
