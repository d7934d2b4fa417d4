#![allow(clippy::print_stdout, clippy::print_stderr)]
use anyhow::{Context, bail, ensure};
use clap::{Parser, Subcommand, ValueHint};
use oxcmap::config::{Config, ShapeLayout};
use oxcmap::graph::{read_graph, remove_blank_nodes, write_graph};
use oxcmap::mapper::{document_to_graph, graph_to_document};
use oxcmap::ontology::{ontology_to_graph, synthesize_ontology};
use oxcmap::paths::{GraphPath, find_paths, instance_nodes, query_targets, resolve_root};
use oxcmap::shacl::{shapes_to_document, shapes_to_graph, synthesize_shapes};
use oxcmap::sparql::synthesize_query;
use oxcmap::vocab::dct;
use oxcmap::{MappedGraph, PrefixTable};
use oxcxl::{CxlDocument, CxlParser, CxlSerializer};
use oxiri::Iri;
use oxrdf::vocab::rdf;
use oxrdf::{Graph, NamedNode, TermRef};
use oxrdfio::RdfFormat;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about, version, name = "oxcmap")]
/// Concept-map / RDF conversion toolkit.
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert between a concept map document (CXL) and RDF
    ///
    /// The direction is chosen from the input extension: a .cxl file is
    /// converted to RDF, an RDF file (.ttl, .nt, .rdf, .owl, .xml) to CXL.
    Convert {
        /// File to convert
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file
        ///
        /// If not present, it is derived from the input file name.
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Round-trip the document through RDF and regenerate the input file
        #[arg(short, long)]
        update: bool,
        /// Additional RDF file(s) unified into the graph before conversion
        #[arg(short, long, num_args = 1.., value_hint = ValueHint::FilePath)]
        merge: Vec<PathBuf>,
        /// Write instance and visualization triples to two separate files
        #[arg(long)]
        separate: bool,
        /// Machine-oriented N-Triples output instead of Turtle
        #[arg(long)]
        machine: bool,
        /// Replace blank nodes with deterministically named resources
        #[arg(long)]
        remove_bnodes: bool,
        /// Do not compact IRIs with the prefix table on output
        #[arg(long)]
        no_prefixes: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Derive SHACL shapes from the instance data
    Shapes {
        /// CXL or RDF file to derive shapes from
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file for the shape graph (Turtle)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Nest referenced shapes anonymously instead of naming every shape
        #[arg(long)]
        no_named_shapes: bool,
        /// Arrange the shape diagram on rings around the root class
        #[arg(long)]
        concentric: bool,
        /// Also write the shape diagram as a CXL document to this file
        #[arg(long, value_hint = ValueHint::FilePath)]
        visualize: Option<PathBuf>,
        /// Explicit root resource
        ///
        /// By default the concept drawn with an oval border is the root.
        #[arg(long)]
        root: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Derive an OWL ontology from the observed shapes
    Ontology {
        /// CXL or RDF file to derive the ontology from
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file for the ontology graph (Turtle)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Align derived properties with the base vocabulary where names match
        ///
        /// Properties without exactly one name match are left unaligned and
        /// reported.
        #[arg(long)]
        specific_properties: bool,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// Synthesize a SPARQL query along the path from the root to each target
    ///
    /// Targets are the concepts drawn with a dashed border; without any, the
    /// query covers the root and its surroundings.
    Query {
        /// CXL or RDF file to derive the query from
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Output file; standard output if not present
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
        /// Skip the per-node OPTIONAL property clauses
        #[arg(long)]
        no_path_properties: bool,
        /// Restrict the query to nodes on the discovered path
        #[arg(long)]
        skip_nodes_outside_path: bool,
        /// Explicit root resource
        #[arg(long)]
        root: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List the paths from the root to every target concept
    Paths {
        /// CXL or RDF file to search
        #[arg(value_hint = ValueHint::FilePath)]
        input: PathBuf,
        /// Explicit root resource
        #[arg(long)]
        root: Option<String>,
        #[command(flatten)]
        common: CommonArgs,
    },
    /// List the built-in prefix registry
    Prefixes,
}

/// Flags shared by every pipeline, frozen into one [`Config`] before any
/// component runs.
#[derive(clap::Args)]
struct CommonArgs {
    /// Do not emit dct:title triples from diagram labels
    #[arg(long)]
    no_titles: bool,
    /// Use deterministic IRIs instead of blank nodes for visualization records
    #[arg(long)]
    no_blank_nodes: bool,
    /// Drop long comments and regenerate them from the graph
    #[arg(long)]
    drop_long_comments: bool,
    /// Namespace under which ontology classes and properties are minted
    #[arg(long, value_hint = ValueHint::Url)]
    onto_namespace: Option<String>,
    /// Display prefix for the ontology namespace
    #[arg(long)]
    onto_prefix: Option<String>,
    /// Additional namespace(s) whose resources count as instances
    #[arg(long, num_args = 1.., value_hint = ValueHint::Url)]
    namespace: Vec<String>,
    /// Additional prefix declaration(s) as name=iri
    #[arg(long, num_args = 1..)]
    prefix: Vec<String>,
}

impl CommonArgs {
    fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config {
            add_titles: !self.no_titles,
            use_blank_nodes: !self.no_blank_nodes,
            drop_long_comments: self.drop_long_comments,
            ..Config::default()
        };
        if let Some(namespace) = &self.onto_namespace {
            Iri::parse(namespace.as_str())
                .with_context(|| format!("The ontology namespace {namespace} is invalid"))?;
            config.ontology_namespace.clone_from(namespace);
        }
        if let Some(prefix) = &self.onto_prefix {
            config.ontology_prefix.clone_from(prefix);
        }
        for namespace in &self.namespace {
            Iri::parse(namespace.as_str())
                .with_context(|| format!("The instance namespace {namespace} is invalid"))?;
            config.instance_namespaces.push(namespace.clone());
        }
        for declaration in &self.prefix {
            let (name, iri) = declaration
                .split_once('=')
                .with_context(|| format!("The prefix declaration {declaration} is not name=iri"))?;
            Iri::parse(iri)
                .with_context(|| format!("The prefix namespace {iri} is invalid"))?;
            config.prefixes.push((name.to_owned(), iri.to_owned()));
        }
        Ok(config)
    }
}

pub fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();
    match Args::parse().command {
        Command::Convert {
            input,
            output,
            update,
            merge,
            separate,
            machine,
            remove_bnodes,
            no_prefixes,
            common,
        } => {
            let mut config = common.config()?;
            config.separate_outputs = separate;
            config.use_prefixes = !no_prefixes;
            config.human_readable = !machine;
            convert(&input, output, update, &merge, remove_bnodes, &config)
        }
        Command::Shapes {
            input,
            output,
            no_named_shapes,
            concentric,
            visualize,
            root,
            common,
        } => {
            let mut config = common.config()?;
            config.named_shapes = !no_named_shapes;
            config.shape_layout = if concentric {
                ShapeLayout::Concentric
            } else {
                ShapeLayout::Network
            };
            config.root = parse_root(root.as_deref())?;
            shapes(&input, output, visualize, &config)
        }
        Command::Ontology {
            input,
            output,
            specific_properties,
            common,
        } => {
            let mut config = common.config()?;
            config.align_specific_properties = specific_properties;
            ontology(&input, output, &config)
        }
        Command::Query {
            input,
            output,
            no_path_properties,
            skip_nodes_outside_path,
            root,
            common,
        } => {
            let mut config = common.config()?;
            config.include_path_properties = !no_path_properties;
            config.include_all_nodes = !skip_nodes_outside_path;
            config.root = parse_root(root.as_deref())?;
            query(&input, output, &config)
        }
        Command::Paths { input, root, common } => {
            let mut config = common.config()?;
            config.root = parse_root(root.as_deref())?;
            paths(&input, &config)
        }
        Command::Prefixes => {
            for (name, iri) in PrefixTable::builtin().iter() {
                println!("{name}: <{iri}>");
            }
            Ok(())
        }
    }
}

fn convert(
    input: &Path,
    output: Option<PathBuf>,
    update: bool,
    merge: &[PathBuf],
    remove_bnodes: bool,
    config: &Config,
) -> anyhow::Result<()> {
    if is_cxl(input) {
        let document = parse_document(input)?;
        let extra = read_merge_graphs(merge)?;
        let mapping = document_to_graph(&document, &extra, config)?;
        if update {
            // the input is only replaced once the full round trip succeeded
            let rebuilt = graph_to_document(&mapping.graph, config)?;
            return write_document(input, &rebuilt);
        }
        let (format, extension) = if config.human_readable {
            (RdfFormat::Turtle, "ttl")
        } else {
            (RdfFormat::NTriples, "nt")
        };
        let output = output.unwrap_or_else(|| input.with_extension(extension));
        let prefixes = PrefixTable::from_config(config);
        if config.separate_outputs {
            write_rdf(
                &output,
                format,
                &mapping.graph.instances,
                &prefixes,
                config,
                remove_bnodes,
            )?;
            write_rdf(
                &sibling(&output, "-visualization"),
                format,
                &mapping.graph.visualization,
                &prefixes,
                config,
                remove_bnodes,
            )
        } else {
            write_rdf(
                &output,
                format,
                &mapping.graph.merged(),
                &prefixes,
                config,
                remove_bnodes,
            )
        }
    } else {
        ensure!(!update, "--update expects a .cxl input file");
        let (mut graph, declared) = read_rdf_file(input)?;
        for extra in read_merge_graphs(merge)? {
            for triple in extra.iter() {
                graph.insert(triple);
            }
        }
        let mut config = config.clone();
        config.prefixes.extend(declared);
        let document = graph_to_document(&MappedGraph::split(&graph), &config)?;
        let output = output.unwrap_or_else(|| input.with_extension("cxl"));
        write_document(&output, &document)
    }
}

fn shapes(
    input: &Path,
    output: Option<PathBuf>,
    visualize: Option<PathBuf>,
    config: &Config,
) -> anyhow::Result<()> {
    let graph = load_mapped_graph(input, config)?;
    let shapes = synthesize_shapes(&graph);
    let shacl = shapes_to_graph(&shapes, config);
    let output = output.unwrap_or_else(|| sibling(&input.with_extension("ttl"), "-shapes"));
    write_rdf(
        &output,
        RdfFormat::Turtle,
        &shacl,
        &PrefixTable::from_config(config),
        config,
        false,
    )?;
    if let Some(diagram) = visualize {
        // the concentric layout rings shapes around the root class, so a
        // missing root is an error there; the network grid needs none
        let root_class = match config.shape_layout {
            ShapeLayout::Concentric => {
                let root = resolve_root(&graph, config)?;
                class_of(&graph.instances, &root)
            }
            ShapeLayout::Network => None,
        };
        let document = shapes_to_document(&shapes, config, root_class.as_ref());
        write_document(&diagram, &document)?;
    }
    Ok(())
}

fn ontology(input: &Path, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let graph = load_mapped_graph(input, config)?;
    let shapes = synthesize_shapes(&graph);
    let model = synthesize_ontology(&shapes, config);
    for property in &model.unaligned {
        warn!("{property} could not be aligned with the base vocabulary");
    }
    let output = output.unwrap_or_else(|| sibling(&input.with_extension("ttl"), "-ontology"));
    write_rdf(
        &output,
        RdfFormat::Turtle,
        &ontology_to_graph(&model, config),
        &PrefixTable::from_config(config),
        config,
        false,
    )
}

fn query(input: &Path, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    let graph = load_mapped_graph(input, config)?;
    let root = resolve_root(&graph, config)?;
    let targets = query_targets(&graph);
    let queries: Vec<String> = if targets.is_empty() {
        let path = GraphPath {
            root,
            steps: Vec::new(),
        };
        vec![synthesize_query(&graph, &path, config)]
    } else {
        find_paths(&graph, &root, &targets)
            .iter()
            .filter_map(|search| {
                if let Some(path) = &search.path {
                    Some(synthesize_query(&graph, path, config))
                } else {
                    warn!("{} is not reachable from the root", search.target);
                    None
                }
            })
            .collect()
    };
    ensure!(!queries.is_empty(), "no target is reachable from the root");
    let text = queries.join("\n");
    if let Some(output) = output {
        write_file(&output, text.as_bytes())
    } else {
        print!("{text}");
        Ok(())
    }
}

fn paths(input: &Path, config: &Config) -> anyhow::Result<()> {
    let graph = load_mapped_graph(input, config)?;
    let root = resolve_root(&graph, config)?;
    let mut targets = query_targets(&graph);
    if targets.is_empty() {
        targets = instance_nodes(&graph, config);
        targets.retain(|target| target != &root);
    }
    let prefixes = PrefixTable::from_config(config);
    for search in find_paths(&graph, &root, &targets) {
        if let Some(path) = &search.path {
            println!("{}", render_path(&graph, &prefixes, path));
        } else {
            println!(
                "no path from {} to {}",
                display_node(&graph, &root),
                display_node(&graph, &search.target)
            );
        }
    }
    Ok(())
}

fn render_path(graph: &MappedGraph, prefixes: &PrefixTable, path: &GraphPath) -> String {
    let mut rendered = display_node(graph, &path.root);
    for step in &path.steps {
        let predicate = prefixes
            .compact(step.predicate.as_str())
            .unwrap_or_else(|| step.predicate.to_string());
        let node = display_node(graph, &step.node);
        if step.forward {
            rendered.push_str(&format!(" -[{predicate}]-> {node}"));
        } else {
            rendered.push_str(&format!(" <-[{predicate}]- {node}"));
        }
    }
    rendered
}

/// A node's title when it has one, else its IRI.
fn display_node(graph: &MappedGraph, node: &NamedNode) -> String {
    graph
        .instances
        .objects_for_subject_predicate(node.as_ref(), dct::TITLE)
        .find_map(|object| match object {
            TermRef::Literal(literal) => Some(literal.value().to_owned()),
            _ => None,
        })
        .unwrap_or_else(|| node.to_string())
}

fn class_of(instances: &Graph, resource: &NamedNode) -> Option<NamedNode> {
    instances
        .objects_for_subject_predicate(resource.as_ref(), rdf::TYPE)
        .find_map(|object| match object {
            TermRef::NamedNode(class) => Some(class.into_owned()),
            _ => None,
        })
}

fn parse_root(root: Option<&str>) -> anyhow::Result<Option<NamedNode>> {
    root.map(|iri| {
        NamedNode::new(iri).with_context(|| format!("The root resource {iri} is invalid"))
    })
    .transpose()
}

fn is_cxl(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|extension| extension.eq_ignore_ascii_case("cxl"))
}

fn rdf_format_from_path(path: &Path) -> anyhow::Result<RdfFormat> {
    let Some(extension) = path.extension().and_then(OsStr::to_str) else {
        bail!("{} has no format extension", path.display());
    };
    // .owl and plain .xml files are RDF/XML in the wild
    if extension.eq_ignore_ascii_case("owl") || extension.eq_ignore_ascii_case("xml") {
        return Ok(RdfFormat::RdfXml);
    }
    RdfFormat::from_extension(&extension.to_ascii_lowercase())
        .with_context(|| format!("{extension} is not a supported RDF extension"))
}

fn parse_document(path: &Path) -> anyhow::Result<CxlDocument> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    CxlParser::parse_read(file).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_rdf_file(path: &Path) -> anyhow::Result<(Graph, Vec<(String, String)>)> {
    let format = rdf_format_from_path(path)?;
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    read_graph(file, format).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_merge_graphs(paths: &[PathBuf]) -> anyhow::Result<Vec<Graph>> {
    paths
        .iter()
        .map(|path| Ok(read_rdf_file(path)?.0))
        .collect()
}

fn load_mapped_graph(input: &Path, config: &Config) -> anyhow::Result<MappedGraph> {
    if is_cxl(input) {
        let document = parse_document(input)?;
        Ok(document_to_graph(&document, &[], config)?.graph)
    } else {
        let (graph, _) = read_rdf_file(input)?;
        Ok(MappedGraph::split(&graph))
    }
}

fn write_rdf(
    path: &Path,
    format: RdfFormat,
    graph: &Graph,
    prefixes: &PrefixTable,
    config: &Config,
    remove_bnodes: bool,
) -> anyhow::Result<()> {
    let mut content = Vec::new();
    if remove_bnodes {
        let skolemized = remove_blank_nodes(graph);
        write_graph(&mut content, format, &skolemized, prefixes, config.use_prefixes)?;
    } else {
        write_graph(&mut content, format, graph, prefixes, config.use_prefixes)?;
    }
    write_file(path, &content)
}

fn write_document(path: &Path, document: &CxlDocument) -> anyhow::Result<()> {
    let content = CxlSerializer::serialize_to_string(document)?;
    write_file(path, content.as_bytes())
}

/// Write-then-rename: a previously valid file is never replaced by a partial
/// one.
fn write_file(path: &Path, content: &[u8]) -> anyhow::Result<()> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = tempfile::NamedTempFile::new_in(directory)
        .with_context(|| format!("Failed to create a temporary file in {}", directory.display()))?;
    file.write_all(content)?;
    file.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// `out.ttl` with suffix `-shapes` is `out-shapes.ttl`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("output");
    let extension = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or("ttl");
    path.with_file_name(format!("{stem}{suffix}.{extension}"))
}
