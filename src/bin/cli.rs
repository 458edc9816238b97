use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use mpegts_psi::xml::{parse_document, to_document, Element};
use mpegts_psi::{BinaryTable, CodecOptions, ConsistencyPolicy, VirtualChannelTable};

/// Root element wrapping the tables of an XML document.
const XML_ROOT: &str = "tsduck";

#[derive(Parser)]
#[clap(name = "psi-tool", about = "Convert virtual channel tables between sections, XML and JSON")]
struct Opt {
    /// JSON file with codec options
    #[clap(long)]
    config: Option<PathBuf>,

    /// Payload bytes per section (header and CRC excluded)
    #[clap(long)]
    max_payload: Option<usize>,

    /// How sections disagreeing on table fields are handled
    #[clap(long, value_enum)]
    consistency: Option<Consistency>,

    /// Output file, stdout when absent
    #[clap(long, short)]
    output: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Binary sections to an XML document
    ToXml { input: PathBuf },
    /// Binary sections to JSON
    ToJson { input: PathBuf },
    /// XML document to binary sections
    FromXml { input: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum Consistency {
    Strict,
    LastWins,
}

impl From<Consistency> for ConsistencyPolicy {
    fn from(c: Consistency) -> Self {
        match c {
            Consistency::Strict => ConsistencyPolicy::Strict,
            Consistency::LastWins => ConsistencyPolicy::LastWins,
        }
    }
}

fn load_options(opt: &Opt) -> anyhow::Result<CodecOptions> {
    let mut opts = match &opt.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            CodecOptions::from_json(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CodecOptions::default(),
    };
    if let Some(n) = opt.max_payload {
        opts.max_section_payload = n;
    }
    if let Some(c) = opt.consistency {
        opts.consistency = c.into();
    }
    Ok(opts)
}

/// Groups back-to-back sections into tables, a new table starting at each
/// section number 0 or table id change.
fn split_tables(all: BinaryTable) -> Vec<BinaryTable> {
    let mut tables: Vec<BinaryTable> = Vec::new();
    for section in all.sections() {
        let starts_new = match tables.last() {
            None => true,
            Some(t) => section.section_number == 0 || t.table_id() != Some(section.table_id),
        };
        if starts_new {
            tables.push(BinaryTable::new());
        }
        if let Some(t) = tables.last_mut() {
            t.add_section(section.clone());
        }
    }
    tables
}

fn read_tables(input: &Path, opts: &CodecOptions) -> anyhow::Result<Vec<VirtualChannelTable>> {
    let data = fs::read(input).with_context(|| format!("reading {}", input.display()))?;
    let all = BinaryTable::from_wire(&data).with_context(|| format!("decoding sections of {}", input.display()))?;
    info!("{}: {} sections", input.display(), all.section_count());

    let mut vcts = Vec::new();
    for table in split_tables(all) {
        match VirtualChannelTable::try_deserialize(&table, opts) {
            Ok(vct) => vcts.push(vct),
            Err(e) => warn!(
                "skipping table 0x{:02X}: {e}",
                table.table_id().unwrap_or_default()
            ),
        }
    }
    Ok(vcts)
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(p) => fs::write(p, bytes).with_context(|| format!("writing {}", p.display())),
        None => {
            let mut out = std::io::stdout().lock();
            out.write_all(bytes)?;
            out.flush()?;
            Ok(())
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::parse();
    let opts = load_options(&opt)?;

    let bytes = match &opt.command {
        Command::ToXml { input } => {
            let mut root = Element::new(XML_ROOT);
            for vct in read_tables(input, &opts)? {
                root.push_child(vct.build_xml());
            }
            to_document(&root)?.into_bytes()
        }
        Command::ToJson { input } => {
            let vcts = read_tables(input, &opts)?;
            let mut text = serde_json::to_string_pretty(&vcts)?;
            text.push('\n');
            text.into_bytes()
        }
        Command::FromXml { input } => {
            let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
            let root = parse_document(&text)?;
            if !root.has_name(XML_ROOT) {
                bail!("expected <{XML_ROOT}> root, found <{}>", root.name());
            }
            let mut wire = Vec::new();
            for element in root.children() {
                let vct = VirtualChannelTable::try_from_xml(element)
                    .with_context(|| format!("in <{}>", element.name()))?;
                let table = vct.serialize(&opts);
                info!("<{}>: {} sections", element.name(), table.section_count());
                wire.extend(table.to_wire());
            }
            wire
        }
    };

    write_output(opt.output.as_deref(), &bytes)
}
