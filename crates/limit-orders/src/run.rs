use {
    crate::{
        cli::{self, Command},
        config::{self, Config},
    },
    anyhow::{Context, Result},
    clap::Parser,
    model::{DomainSeparator, Extension, MakerTraits, Order, TakerTraits, extension::Field},
    serde_json::{Value, json},
};

/// Entry point of the binary.
pub fn start(args: impl Iterator<Item = String>) -> Result<()> {
    let args = cli::Args::parse_from(args);
    let config = match &args.config {
        Some(path) => config::load(path)?,
        None => Config::default(),
    };
    let log_filter = args.log.as_deref().unwrap_or(&config.log_filter);
    let mut obs_config = observe::Config::new(log_filter, args.stderr_threshold, false);
    if config.log_json {
        obs_config = obs_config.with_json_format();
    }
    observe::tracing::initialize(&obs_config);
    tracing::info!("running limit-orders with arguments:\n{args}");

    let output = run(&args.command, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Executes a command and returns what it prints.
pub fn run(command: &Command, config: &Config) -> Result<Value> {
    match command {
        Command::OrderHash { order } => {
            let data = std::fs::read_to_string(order)
                .with_context(|| format!("I/O error while reading {order:?}"))?;
            let order: Order = serde_json::from_str(&data)
                .with_context(|| format!("invalid order JSON in {order:?}"))?;
            let domain_separator = DomainSeparator::new(&config.domain);
            Ok(json!({
                "domainSeparator": domain_separator.0,
                "structHash": order.hash_struct(),
                "orderHash": order.hash(&domain_separator),
            }))
        }
        Command::MakerTraits { word } => {
            let traits = MakerTraits(parse_word(word)?);
            Ok(serde_json::to_value(traits.decode())?)
        }
        Command::TakerTraits { word } => {
            let traits = TakerTraits(parse_word(word)?);
            Ok(serde_json::to_value(traits.decode())?)
        }
        Command::Extension { bytes } => {
            let bytes = const_hex::decode(bytes).context("extension is not valid hex")?;
            let extension = Extension::decode(&bytes)?;
            Ok(describe_extension(&extension))
        }
    }
}

fn parse_word(word: &str) -> Result<alloy::primitives::U256> {
    number::serialization::parse(word).map_err(anyhow::Error::msg)
}

fn describe_extension(extension: &Extension) -> Value {
    let mut fields = serde_json::Map::new();
    for field in Field::ALL {
        let value = extension
            .field(field)
            .map_or(Value::Null, |data| const_hex::encode_prefixed(data).into());
        fields.insert(format!("{field:?}"), value);
    }
    let interaction = |interaction: Option<model::extension::Interaction>| {
        interaction.map_or(Value::Null, |interaction| {
            json!({
                "target": interaction.target,
                "data": const_hex::encode_prefixed(interaction.data),
            })
        })
    };
    json!({
        "fields": fields,
        "customData": const_hex::encode_prefixed(extension.custom_data()),
        "preInteraction": interaction(extension.pre_interaction()),
        "postInteraction": interaction(extension.post_interaction()),
        "hash": format!("{:#x}", Extension::hash(extension.as_bytes())),
    })
}
