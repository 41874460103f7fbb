use std::path::Path;

use aip_bag::tags::BAG_INFO_TXT;
use aip_bag::{PackageReader, VerifyReport};
use aip_pack::ObjectProperties;
use aip_replicate::ReplicateConfig;
use aip_store::{LocalReplicaStore, ReplicaStore};
use aip_types::{Handle, ReplicaRef};
use anyhow::Context;
use colored::Colorize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ReplicateConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ReplicateConfig::default(),
    };
    match cli.command {
        Command::Inspect(args) => cmd_inspect(&args.archive, &cli.format),
        Command::Verify(args) => cmd_verify(&args.archive, &cli.format),
        Command::Ref(args) => cmd_ref(args, &config),
        Command::Exists(args) => cmd_exists(args, &config),
        Command::CheckConfig(args) => cmd_check_config(&args.path),
    }
}

fn cmd_inspect(archive: &Path, format: &OutputFormat) -> anyhow::Result<()> {
    let mut reader = PackageReader::open(archive)
        .with_context(|| format!("opening {}", archive.display()))?;
    let props = ObjectProperties::read(&reader)?;
    let tags = reader.read_tags(BAG_INFO_TXT)?;
    let metadata = reader.read_metadata()?;
    let payloads = reader.payloads()?;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "object": {
                    "kind": props.kind.as_str(),
                    "handle": props.handle,
                    "owner": props.owner,
                    "children": props.children,
                },
                "bag_info": tags.iter().map(|(k, v)| serde_json::json!([k, v])).collect::<Vec<_>>(),
                "metadata": metadata
                    .iter()
                    .map(|e| serde_json::json!({ "name": e.name(), "value": e.body }))
                    .collect::<Vec<_>>(),
                "payloads": payloads
                    .iter()
                    .map(|p| serde_json::json!({ "bundle": p.bundle, "id": p.id, "name": p.field("name") }))
                    .collect::<Vec<_>>(),
                "logo": reader.find_logo().is_some(),
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("{} {}", props.kind.to_string().cyan().bold(), props.handle.as_str().yellow());
            if let Some(owner) = &props.owner {
                println!("  Owner: {}", owner.as_str().yellow());
            }
            for child in &props.children {
                println!("  Child: {}", child.as_str().yellow());
            }
            println!("\n{}", BAG_INFO_TXT.bold());
            for (label, value) in &tags {
                println!("  {label}: {value}");
            }
            println!("\n{}", "metadata".bold());
            for element in &metadata {
                println!("  {} = {}", element.name().unwrap_or("?").green(), element.body);
            }
            if !payloads.is_empty() {
                println!("\n{}", "payloads".bold());
                for payload in &payloads {
                    println!(
                        "  {}/{} {}",
                        payload.bundle.cyan(),
                        payload.id,
                        payload.field("name").unwrap_or("").dimmed()
                    );
                }
            }
            if reader.find_logo().is_some() {
                println!("\n{} present", "logo".bold());
            }
        }
    }
    reader.clean()?;
    Ok(())
}

fn cmd_verify(archive: &Path, format: &OutputFormat) -> anyhow::Result<()> {
    let mut reader = PackageReader::open(archive)
        .with_context(|| format!("opening {}", archive.display()))?;
    let report = reader.verify()?;
    reader.clean()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_valid() {
        anyhow::bail!("package {} failed verification", archive.display());
    }
    Ok(())
}

fn print_report(report: &VerifyReport) {
    if report.is_valid() {
        println!(
            "{} {} files match ({})",
            "✓".green().bold(),
            report.checked,
            report.algorithm
        );
        return;
    }
    println!("{} package is not valid", "✗".red().bold());
    for path in &report.mismatched {
        println!("  {} {path}", "mismatch:".red());
    }
    for path in &report.missing {
        println!("  {} {path}", "missing:".red());
    }
    for path in &report.unlisted {
        println!("  {} {path}", "unlisted:".yellow());
    }
}

fn cmd_ref(args: RefArgs, config: &ReplicateConfig) -> anyhow::Result<()> {
    let handle = Handle::parse(args.handle)?;
    let format = args.archive_format.unwrap_or(config.archive_format);
    println!("{}", ReplicaRef::new(&handle, format.extension()).key());
    Ok(())
}

fn cmd_exists(args: ExistsArgs, config: &ReplicateConfig) -> anyhow::Result<()> {
    let handle = Handle::parse(args.handle)?;
    let format = args.archive_format.unwrap_or(config.archive_format);
    let group = args.group.as_deref().unwrap_or(&config.aip_group);
    let store = LocalReplicaStore::open(args.store.clone())?.read_only();
    let reference = ReplicaRef::new(&handle, format.extension());
    if store.exists(group, &reference)? {
        let size = store.size(group, &reference)?.unwrap_or(0);
        println!("{} {} ({size} bytes)", "✓".green().bold(), reference.key());
        Ok(())
    } else {
        println!("{} {} not in group {}", "✗".red().bold(), reference.key(), group.bold());
        anyhow::bail!("replica missing for {handle}")
    }
}

fn cmd_check_config(path: &Path) -> anyhow::Result<()> {
    let config = ReplicateConfig::load(path)?;
    println!("{} {}", "✓".green().bold(), path.display());
    println!("  Archive: {} ({})", config.archive_format.extension(), config.digest.name());
    println!("  Group: {}", config.aip_group.bold());
    println!("  Staging: {}", config.staging_dir.display());
    for (name, profile) in &config.restore {
        let options = profile.options(name)?;
        println!(
            "  Restore {}: {:?}{}",
            name.yellow(),
            options.mode,
            if options.recursive { ", recursive" } else { "" }
        );
    }
    Ok(())
}
