mod error {
    use thiserror::Error;

    /// Failures raised by the graph store while the graph is being built.
    #[derive(Debug, Error, PartialEq, Eq)]
    pub enum GraphError {
        // display text is the wire format of the invalid pair report
        #[error("the pair <{from},{to}> is invalid")]
        InvalidVertex { from: i64, to: i64 },

        #[error("graph size {requested} exceeds the limit of {max} vertices")]
        TooManyVertices { requested: usize, max: usize },
    }

    /// A malformed edge line. Nothing from the line is committed.
    #[derive(Debug, Error)]
    pub enum ParseError {
        #[error("edge line has no opening brace")]
        MissingOpenBrace,

        #[error("edge line has no closing brace")]
        MissingCloseBrace,

        #[error("edge list has an odd number of tokens ({0})")]
        OddTokenCount(usize),

        #[error("token {0:?} holds no vertex number")]
        BadToken(String),

        #[error("edge line is {len} characters long (max {max})")]
        LineTooLong { len: usize, max: usize },

        #[error("could not split edge list: {0}")]
        Csv(#[from] csv::Error),
    }

    #[derive(Debug, Error)]
    pub enum AppError {
        #[error("i/o error: {0}")]
        Io(#[from] std::io::Error),

        #[error("invalid config file: {0}")]
        Config(#[from] serde_json::Error),

        #[error("could not start logging: {0}")]
        Logging(String),
    }
}

mod config {
    use crate::error::AppError;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
    #[serde(default)]
    pub struct Config {
        pub max_vertices: usize, // largest graph a `V` command may declare
        pub max_line: usize,     // longest accepted edge line, in characters
        pub log_filter: String,  // used when RUST_LOG is unset
    }

    impl Default for Config {
        fn default() -> Self {
            Self {
                max_vertices: 1000,
                max_line: 4000,
                log_filter: "warn".to_string(),
            }
        }
    }

    impl Config {
        pub fn from_json(text: &str) -> Result<Self, AppError> {
            Ok(serde_json::from_str(text)?)
        }

        pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
            match path {
                Some(path) => Self::from_json(&fs::read_to_string(path)?),
                None => Ok(Self::default()), // no file, built-in limits
            }
        }
    }
}

mod logging {
    use crate::error::AppError;
    use tracing_subscriber::EnvFilter;

    // logs go to stderr so stdout only carries query results
    pub fn init(default_filter: &str) -> Result<(), AppError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init()
            .map_err(|e| AppError::Logging(e.to_string()))
    }
}

mod graph_store {
    use crate::error::GraphError;

    /// Undirected graph over the vertices `0..vertex_count`.
    ///
    /// Each vertex keeps its neighbors sorted and without duplicates, which
    /// is the same relation as a symmetric boolean matrix scanned row-wise.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Graph {
        vertex_count: usize,
        max_vertices: usize,
        adjacency: Vec<Vec<usize>>,
    }

    impl Graph {
        pub fn new(max_vertices: usize) -> Self {
            Self {
                vertex_count: 0,
                max_vertices,
                adjacency: Vec::new(),
            }
        }

        /// Starts a new graph with `v` vertices and no edges.
        ///
        /// A size above the configured cap leaves an empty graph behind.
        pub fn declare_size(&mut self, v: usize) -> Result<(), GraphError> {
            self.adjacency.clear();
            self.vertex_count = 0;
            if v > self.max_vertices {
                return Err(GraphError::TooManyVertices {
                    requested: v,
                    max: self.max_vertices,
                });
            }
            self.vertex_count = v;
            self.adjacency.resize(v, Vec::new());
            Ok(())
        }

        pub fn reset_edges(&mut self) {
            for neighbors in self.adjacency.iter_mut() {
                neighbors.clear();
            }
        }

        pub fn add_edge(&mut self, a: i64, b: i64) -> Result<(), GraphError> {
            let (from, to) = match (self.index(a), self.index(b)) {
                (Some(from), Some(to)) => (from, to),
                _ => return Err(GraphError::InvalidVertex { from: a, to: b }),
            };
            Self::link(&mut self.adjacency[from], to);
            Self::link(&mut self.adjacency[to], from); // no-op for a self-loop
            Ok(())
        }

        // keeps the list ascending, re-adding an edge changes nothing
        fn link(neighbors: &mut Vec<usize>, vertex: usize) {
            if let Err(pos) = neighbors.binary_search(&vertex) {
                neighbors.insert(pos, vertex);
            }
        }

        fn index(&self, v: i64) -> Option<usize> {
            usize::try_from(v).ok().filter(|&v| self.contains(v))
        }

        pub fn contains(&self, v: usize) -> bool {
            v < self.vertex_count
        }

        pub fn neighbors(&self, v: usize) -> &[usize] {
            self.adjacency.get(v).map(Vec::as_slice).unwrap_or(&[])
        }

        pub fn vertex_count(&self) -> usize {
            self.vertex_count
        }

        pub fn edge_count(&self) -> usize {
            self.adjacency
                .iter()
                .enumerate()
                .map(|(v, neighbors)| neighbors.iter().filter(|&&n| n >= v).count())
                .sum() // each undirected edge counted from its lower endpoint
        }
    }
}

mod edge_parser {
    use crate::error::{GraphError, ParseError};
    use crate::graph_store::Graph;
    use tracing::{debug, warn};

    /// Result of loading one edge line into the graph.
    #[derive(Debug, Default, PartialEq, Eq)]
    pub struct LoadSummary {
        pub added: usize,
        pub rejected: Vec<GraphError>, // in the order the pairs appeared
    }

    /// Reads the vertex number out of a single edge-list token.
    ///
    /// Leading non-digit characters such as `(` are skipped and the first
    /// run of ASCII digits is the value. A `-` right before the digits makes
    /// the value negative so that it is later reported as an invalid pair.
    /// A run too long for `i64` saturates to `i64::MAX`, which is reported
    /// as an invalid pair as well.
    pub fn parse_vertex(token: &str) -> Option<i64> {
        let start = token.find(|c: char| c.is_ascii_digit())?;
        let digits = &token[start..];
        let end = digits
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(digits.len());
        let value: i64 = digits[..end].parse().unwrap_or(i64::MAX); // only overflow can fail
        if token[..start].ends_with('-') {
            Some(-value)
        } else {
            Some(value)
        }
    }

    fn split_tokens(content: &str) -> Result<Vec<String>, ParseError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());

        let mut record = csv::StringRecord::new();
        if !reader.read_record(&mut record)? {
            return Ok(Vec::new());
        }
        Ok(record.iter().map(str::to_string).collect())
    }

    /// Parses `... { a,b , c,d , ... } ...` into `(from, to)` pairs.
    pub fn parse_line(line: &str) -> Result<Vec<(i64, i64)>, ParseError> {
        if line.trim().is_empty() {
            return Ok(Vec::new());
        }
        let open = line.find('{').ok_or(ParseError::MissingOpenBrace)?;
        let after = &line[open + 1..];
        let close = after.find('}').ok_or(ParseError::MissingCloseBrace)?;
        let content = &after[..close];
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let tokens = split_tokens(content)?;
        if tokens.len() % 2 != 0 {
            return Err(ParseError::OddTokenCount(tokens.len()));
        }
        let values = tokens
            .into_iter()
            .map(|token| parse_vertex(&token).ok_or(ParseError::BadToken(token)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(values.chunks_exact(2).map(|pair| (pair[0], pair[1])).collect())
    }

    /// Replaces the graph's edges with the ones listed on `line`.
    ///
    /// Out-of-range pairs are skipped and collected; a malformed line
    /// leaves the graph with no edges at all.
    pub fn load_line(graph: &mut Graph, line: &str, max_line: usize) -> Result<LoadSummary, ParseError> {
        graph.reset_edges();

        let len = line.chars().count();
        let parsed = if len > max_line {
            Err(ParseError::LineTooLong { len, max: max_line })
        } else {
            parse_line(line)
        };
        let pairs = parsed.map_err(|e| {
            warn!(error = %e, "skipping malformed edge line");
            e
        })?;

        let mut summary = LoadSummary::default();
        for (from, to) in pairs {
            match graph.add_edge(from, to) {
                Ok(()) => summary.added += 1,
                Err(e) => summary.rejected.push(e),
            }
        }
        debug!(added = summary.added, rejected = summary.rejected.len(), "loaded edge line");
        Ok(summary)
    }
}

mod path_finder {
    use crate::graph_store::Graph;
    use std::collections::VecDeque;
    use tracing::debug;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PathResult {
        Found(Vec<usize>),
        NoPath,
    }

    impl PathResult {
        pub fn hops(&self) -> Option<usize> {
            match self {
                PathResult::Found(path) => Some(path.len().saturating_sub(1)),
                PathResult::NoPath => None,
            }
        }
    }

    /// BFS tree of a single query. The source is its own parent.
    #[derive(Debug, Clone)]
    pub struct ParentMap {
        parent: Vec<Option<usize>>,
    }

    impl ParentMap {
        fn new(size: usize) -> Self {
            Self { parent: vec![None; size] }
        }

        pub fn parent(&self, v: usize) -> Option<usize> {
            self.parent.get(v).copied().flatten()
        }

        pub fn is_visited(&self, v: usize) -> bool {
            self.parent(v).is_some()
        }

        fn visit(&mut self, v: usize, parent: usize) {
            self.parent[v] = Some(parent);
        }
    }

    /// Breadth-first search from `src`, stopping once `dst` leaves the queue.
    pub fn bfs(graph: &Graph, src: usize, dst: usize) -> ParentMap {
        let mut parents = ParentMap::new(graph.vertex_count());
        if !graph.contains(src) {
            return parents; // nothing can be visited
        }

        let mut queue: VecDeque<usize> = VecDeque::new();
        parents.visit(src, src);
        queue.push_back(src);

        while let Some(curr) = queue.pop_front() {
            if curr == dst {
                break;
            }
            for &next in graph.neighbors(curr) {
                if !parents.is_visited(next) {
                    parents.visit(next, curr);
                    queue.push_back(next);
                } // ascending neighbor order decides ties between equal-length paths
            }
        }
        parents
    }

    /// Walks parent links from `dst` back to the root, returned root first.
    pub fn reconstruct_path(parents: &ParentMap, dst: usize) -> Option<Vec<usize>> {
        let mut path = vec![dst];
        let mut curr = dst;
        loop {
            let parent = parents.parent(curr)?;
            if parent == curr {
                break;
            }
            path.push(parent);
            curr = parent;
        }
        path.reverse();
        Some(path)
    }

    pub fn shortest_path(graph: &Graph, src: usize, dst: usize) -> PathResult {
        if !graph.contains(src) || !graph.contains(dst) {
            return PathResult::NoPath;
        }
        let parents = bfs(graph, src, dst);
        let result = match reconstruct_path(&parents, dst) {
            Some(path) => PathResult::Found(path),
            None => PathResult::NoPath,
        };
        debug!(src, dst, hops = ?result.hops(), "shortest path query");
        result
    }
}

mod commands {
    use crate::config::Config;
    use crate::edge_parser;
    use crate::graph_store::Graph;
    use crate::path_finder::{self, PathResult};
    use std::io::{self, BufRead, Write};
    use tracing::{debug, info, warn};

    /// Whitespace token reader that can also hand over the rest of a line.
    pub struct TokenReader<R> {
        reader: R,
        line: String,
        pos: usize,
    }

    impl<R: BufRead> TokenReader<R> {
        pub fn new(reader: R) -> Self {
            Self {
                reader,
                line: String::new(),
                pos: 0,
            }
        }

        // bytes that are not UTF-8 turn into U+FFFD and end up in an ignored token
        fn next_line(&mut self) -> io::Result<bool> {
            let mut buf = Vec::new();
            let read = self.reader.read_until(b'\n', &mut buf)?;
            self.line = String::from_utf8_lossy(&buf).into_owned();
            self.pos = 0;
            Ok(read > 0)
        }

        pub fn next_token(&mut self) -> io::Result<Option<String>> {
            loop {
                let rest = &self.line[self.pos..];
                let trimmed = rest.trim_start();
                if !trimmed.is_empty() {
                    let start = self.pos + (rest.len() - trimmed.len());
                    let len = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
                    self.pos = start + len;
                    return Ok(Some(self.line[start..self.pos].to_string()));
                }
                if !self.next_line()? {
                    return Ok(None); // end of input
                }
            }
        }

        /// The rest of the current line, or the next line when that is blank
        /// and holds a `{`. Any other next line stays queued for `next_token`.
        pub fn edge_line(&mut self) -> io::Result<String> {
            let rest = self.line[self.pos..].trim().to_string();
            self.pos = self.line.len();
            if !rest.is_empty() || !self.next_line()? {
                return Ok(rest);
            }
            if !self.line.contains('{') {
                return Ok(String::new());
            }
            let next = self.line.trim().to_string();
            self.pos = self.line.len();
            Ok(next)
        }

        /// Next token if it is an integer, of any size.
        fn next_integer(&mut self, command: &str) -> io::Result<Option<String>> {
            let token = self.next_token()?;
            let integer = token.filter(|t| is_integer(t));
            if integer.is_none() {
                warn!(command, "skipping command with a bad argument");
            }
            Ok(integer)
        }
    }

    // optional `-` followed by ASCII digits
    fn is_integer(token: &str) -> bool {
        let digits = token.strip_prefix('-').unwrap_or(token);
        !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
    }

    // integers beyond i64 are echoed as written
    fn echo(token: &str) -> String {
        token
            .parse::<i64>()
            .map_or_else(|_| token.to_string(), |v| v.to_string())
    }

    fn declare<R: BufRead>(graph: &mut Graph, tokens: &mut TokenReader<R>) -> io::Result<()> {
        let Some(token) = tokens.next_integer("V")? else {
            return Ok(());
        };
        if token.starts_with('-') {
            warn!(token = %token, "skipping negative graph size");
            return Ok(());
        }
        let v = token.parse::<usize>().unwrap_or(usize::MAX); // overflow is above any cap
        match graph.declare_size(v) {
            Ok(()) => info!(vertices = v, "declared new graph"),
            Err(e) => warn!(error = %e, "graph left empty"),
        }
        Ok(())
    }

    fn load_edges<R: BufRead, W: Write>(
        graph: &mut Graph,
        tokens: &mut TokenReader<R>,
        out: &mut W,
        config: &Config,
    ) -> io::Result<()> {
        let line = tokens.edge_line()?;
        match edge_parser::load_line(graph, &line, config.max_line) {
            Ok(summary) => {
                for rejected in &summary.rejected {
                    writeln!(out, "Error: {}.", rejected)?;
                }
                info!(edges = graph.edge_count(), "loaded edges");
            }
            Err(e) => debug!(error = %e, "edge line discarded"),
        }
        Ok(())
    }

    fn query<R: BufRead, W: Write>(graph: &Graph, tokens: &mut TokenReader<R>, out: &mut W) -> io::Result<()> {
        let src = tokens.next_integer("s")?;
        let dst = tokens.next_integer("s")?;
        let (Some(src), Some(dst)) = (src, dst) else {
            return Ok(());
        };

        // negative or overflowing vertices can never be reached
        let result = match (src.parse::<usize>(), dst.parse::<usize>()) {
            (Ok(s), Ok(d)) => path_finder::shortest_path(graph, s, d),
            _ => PathResult::NoPath,
        };
        match result {
            PathResult::Found(path) => {
                let line: Vec<String> = path.iter().map(usize::to_string).collect();
                writeln!(out, "{}", line.join("-"))
            }
            PathResult::NoPath => writeln!(out, "Error: no path is found between {} and {}.", echo(&src), echo(&dst)),
        }
    }

    /// Runs every directive in `reader`, writing results to `out`.
    pub fn run<R: BufRead, W: Write>(reader: R, out: &mut W, config: &Config) -> io::Result<()> {
        let mut tokens = TokenReader::new(reader);
        let mut graph = Graph::new(config.max_vertices);

        while let Some(command) = tokens.next_token()? {
            match command.as_str() {
                "V" => declare(&mut graph, &mut tokens)?,
                "E" => load_edges(&mut graph, &mut tokens, out, config)?,
                "s" => query(&graph, &mut tokens, out)?,
                other => debug!(command = other, "ignoring unknown command"),
            }
        }
        out.flush()
    }
}

use clap::Parser;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

/// Reads graph directives and prints BFS shortest paths.
#[derive(Parser, Debug)]
#[command(name = "bfs_paths")]
struct Opt {
    /// directive file, stdin when omitted
    input: Option<PathBuf>,
    /// JSON file with limits and the log filter
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    max_vertices: Option<usize>,
    /// tracing filter, RUST_LOG takes precedence
    #[arg(short, long)]
    log: Option<String>,
}

fn main() -> Result<(), error::AppError> {
    let opt = Opt::parse();
    let mut config = config::Config::load(opt.config.as_deref())?;
    if let Some(max) = opt.max_vertices {
        config.max_vertices = max;
    }
    if let Some(filter) = opt.log {
        config.log_filter = filter;
    } // command line wins over the config file
    logging::init(&config.log_filter)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match opt.input {
        Some(path) => commands::run(BufReader::new(File::open(path)?), &mut out, &config)?,
        None => commands::run(io::stdin().lock(), &mut out, &config)?,
    }
    Ok(())
}
