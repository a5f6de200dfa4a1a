use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use topo_layout::naming::{self, Registry, decode};
use topo_layout::{Result, diagnostics, facts, model};

#[derive(Parser)]
#[command(name = "topo-layout")]
#[command(about = "Multi-layer network topology synthesis and 3D layout", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Args)]
struct RegistryArgs {
    /// Naming scheme overlay (JSON), laid over the builtin scheme.
    #[arg(long)]
    registry: Option<String>,

    /// Use the --registry document alone, without the builtin scheme.
    #[arg(long, requires = "registry")]
    registry_only: bool,
}

impl RegistryArgs {
    fn load(&self) -> Result<Registry> {
        naming::load_registry(self.registry.as_deref(), self.registry_only)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compose, pair, lay out and partition; write the report JSON.
    Layout {
        /// Combined facts document.
        #[arg(long, conflicts_with_all = ["physical", "redundancy", "peering", "devices"])]
        facts: Option<String>,

        /// Physical-adjacency collector output.
        #[arg(long)]
        physical: Option<String>,

        /// Redundancy-group collector output.
        #[arg(long)]
        redundancy: Option<String>,

        /// Routing-peering collector output.
        #[arg(long)]
        peering: Option<String>,

        /// Extra device names (JSON list).
        #[arg(long)]
        devices: Option<String>,

        #[command(flatten)]
        registry: RegistryArgs,

        /// Output file; stdout when omitted.
        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Decode device names and print what the registry makes of them.
    Decode {
        #[arg(required = true)]
        names: Vec<String>,

        #[command(flatten)]
        registry: RegistryArgs,
    },

    /// Validate a naming scheme and print a summary.
    CheckRegistry {
        #[command(flatten)]
        registry: RegistryArgs,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    diagnostics::init(cli.verbose);

    match cli.cmd {
        Commands::Layout {
            facts: combined,
            physical,
            redundancy,
            peering,
            devices,
            registry,
            out,
        } => {
            // 1) Registry first: a bad scheme stops everything.
            let registry = registry.load()?;

            // 2) Facts.
            let facts = match combined {
                Some(path) => facts::load_combined(&path)?,
                None => facts::load_sources(
                    devices.as_deref(),
                    physical.as_deref(),
                    redundancy.as_deref(),
                    peering.as_deref(),
                )?,
            };
            if facts.is_empty() {
                tracing::warn!("no devices or edge facts loaded; report will be empty");
            }

            // 3) Pipeline.
            let report = model::synthesize(&facts, &registry)?;
            let json = serde_json::to_string_pretty(&report)?;

            // 4) Write.
            match out {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("write {}", path))?;
                    println!("Wrote {}", path);
                }
                None => println!("{}", json),
            }
        }

        Commands::Decode { names, registry } => {
            let registry = registry.load()?;
            println!(
                "{:<20} {:<6} {:<6} {:<6} {:<7} {:>6} {:>5} {:>7}  status",
                "name", "site", "tier", "role", "ordinal", "level", "lane", "lane-x"
            );
            for name in &names {
                let fact = decode(name, &registry);
                let (level, lane, lane_x) = match registry.tier_info(&fact.tier) {
                    Some(t) if fact.valid => (
                        format!("{:.1}", t.level),
                        t.lane.to_string(),
                        format!("{:.1}", registry.lane_x(t.lane)),
                    ),
                    _ => ("-".into(), "-".into(), "-".into()),
                };
                let status = match &fact.failure {
                    None if registry.is_known_role(&fact.role) => "ok".to_string(),
                    None => "ok (unknown role, default style)".to_string(),
                    Some(reason) => format!("invalid: {}", reason),
                };
                println!(
                    "{:<20} {:<6} {:<6} {:<6} {:<7} {:>6} {:>5} {:>7}  {}",
                    fact.name, fact.site, fact.tier, fact.role, fact.ordinal, level, lane, lane_x, status
                );
            }
        }

        Commands::CheckRegistry { registry } => {
            let registry = registry.load()?;
            let s = registry.summary();
            println!("sites:          {} ({})", s.sites, registry.sites().collect::<Vec<_>>().join(" "));
            println!("tiers:          {} ({} distinct levels)", s.tiers, s.distinct_levels);
            for (code, info) in registry.tiers() {
                println!(
                    "  {:<6} level {:>5.1}  lane {:>3}  {}",
                    code,
                    info.level,
                    info.lane,
                    registry.tier_display_name(code)
                );
            }
            println!("roles:          {}", s.roles);
            println!("level range:    {:.1} .. {:.1}", s.level_range.0, s.level_range.1);
            println!("lane range:     {} .. {}", s.lane_range.0, s.lane_range.1);
            println!("OK");
        }
    }

    Ok(())
}
