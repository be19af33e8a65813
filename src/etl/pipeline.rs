//! Pipeline graph: channel routing and pull-driven execution

use super::{Channel, Emit, Extractor, Loader, Transformer};
use crate::error::EtlError;
use crate::row::Row;
use eyre::{Context, Result};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// Handle to a node added to a [`PipelineBuilder`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

enum Node {
    Source(Box<dyn Extractor>),
    Transform(Box<dyn Transformer>),
}

impl Node {
    fn name(&self) -> &str {
        match self {
            Self::Source(source) => source.name(),
            Self::Transform(transformer) => transformer.name(),
        }
    }

    fn input_channels(&self) -> Vec<Channel> {
        match self {
            Self::Source(_) => Vec::new(),
            Self::Transform(transformer) => transformer.input_channels(),
        }
    }

    fn output_channels(&self) -> Vec<Channel> {
        match self {
            Self::Source(_) => vec![Channel::main()],
            Self::Transform(transformer) => transformer.output_channels(),
        }
    }
}

struct Wire {
    from: NodeId,
    output: Channel,
    to: NodeId,
    input: Channel,
}

#[derive(Debug, Clone, PartialEq)]
enum Destination {
    Node { id: NodeId, input: Channel },
    Output,
}

/// Builder wiring extractors and transformers into a [`Pipeline`]
///
/// # Example
/// ```
/// use rowpipe::etl::{PipelineBuilder, RowsExtractor};
/// use rowpipe::transform::{Clean, Override};
/// use rowpipe::row;
///
/// # fn main() -> eyre::Result<()> {
/// let mut builder = PipelineBuilder::new();
/// let source = builder.add_source(RowsExtractor::new(vec![row! { "id" => 7, "_tmp" => 1 }]));
/// let tag = builder.add(Override::new(row! { "status" => "ok" }));
/// let clean = builder.add(Clean);
/// builder.chain(&[source, tag, clean]).output(clean);
///
/// let rows = builder.build()?.collect()?;
/// assert_eq!(rows, vec![row! { "id" => 7, "status" => "ok" }]);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PipelineBuilder {
    nodes: Vec<Node>,
    wires: Vec<Wire>,
    outputs: Vec<(NodeId, Channel)>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source node
    pub fn add_source(&mut self, source: impl Extractor + 'static) -> NodeId {
        self.add_boxed_source(Box::new(source))
    }

    pub fn add_boxed_source(&mut self, source: Box<dyn Extractor>) -> NodeId {
        self.nodes.push(Node::Source(source));
        NodeId(self.nodes.len() - 1)
    }

    /// Add a transform node
    pub fn add(&mut self, transformer: impl Transformer + 'static) -> NodeId {
        self.add_boxed(Box::new(transformer))
    }

    pub fn add_boxed(&mut self, transformer: Box<dyn Transformer>) -> NodeId {
        self.nodes.push(Node::Transform(transformer));
        NodeId(self.nodes.len() - 1)
    }

    /// Wire the main output of `from` to the main input of `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> &mut Self {
        self.connect_channel(from, Channel::main(), to, Channel::main())
    }

    /// Wire a named output channel of `from` to a named input channel of `to`
    pub fn connect_channel(
        &mut self,
        from: NodeId,
        output: impl Into<Channel>,
        to: NodeId,
        input: impl Into<Channel>,
    ) -> &mut Self {
        self.wires.push(Wire {
            from,
            output: output.into(),
            to,
            input: input.into(),
        });
        self
    }

    /// Connect consecutive nodes main to main
    pub fn chain(&mut self, nodes: &[NodeId]) -> &mut Self {
        for pair in nodes.windows(2) {
            self.connect(pair[0], pair[1]);
        }
        self
    }

    /// Expose the main output of `node` to the run's loader
    pub fn output(&mut self, node: NodeId) -> &mut Self {
        self.output_channel(node, Channel::main())
    }

    /// Expose a named output channel of `node` to the run's loader
    pub fn output_channel(&mut self, node: NodeId, channel: impl Into<Channel>) -> &mut Self {
        self.outputs.push((node, channel.into()));
        self
    }

    /// Validate the wiring and produce a runnable pipeline
    ///
    /// # Errors
    /// Returns [`EtlError::Routing`] if:
    /// - a wire or output names an unknown node
    /// - a wire uses a channel the producer does not declare
    /// - a wire targets an input channel the consumer does not declare
    /// - a declared output channel is neither wired nor exposed
    /// - the graph contains a cycle
    pub fn build(self) -> Result<Pipeline> {
        let names: Vec<String> = self.nodes.iter().map(|n| n.name().to_string()).collect();
        let outputs: Vec<Vec<Channel>> = self.nodes.iter().map(Node::output_channels).collect();
        let inputs: Vec<Vec<Channel>> = self.nodes.iter().map(Node::input_channels).collect();

        let known = |id: NodeId| -> Result<usize> {
            if id.0 < names.len() {
                Ok(id.0)
            } else {
                Err(EtlError::routing(format!("unknown node {id}")).into())
            }
        };

        let mut routes: HashMap<(NodeId, Channel), Vec<Destination>> = HashMap::new();
        let mut successors = vec![Vec::new(); names.len()];

        for wire in &self.wires {
            let from = known(wire.from)?;
            let to = known(wire.to)?;
            if !outputs[from].contains(&wire.output) {
                return Err(EtlError::routing(format!(
                    "node '{}' does not emit on channel '{}'",
                    names[from], wire.output
                ))
                .into());
            }
            if !inputs[to].contains(&wire.input) {
                return Err(EtlError::routing(format!(
                    "node '{}' has no input channel '{}'",
                    names[to], wire.input
                ))
                .into());
            }
            routes
                .entry((wire.from, wire.output.clone()))
                .or_default()
                .push(Destination::Node {
                    id: wire.to,
                    input: wire.input.clone(),
                });
            successors[from].push(to);
        }

        for (node, channel) in &self.outputs {
            let id = known(*node)?;
            if !outputs[id].contains(channel) {
                return Err(EtlError::routing(format!(
                    "node '{}' does not emit on channel '{}'",
                    names[id], channel
                ))
                .into());
            }
            routes
                .entry((*node, channel.clone()))
                .or_default()
                .push(Destination::Output);
        }

        for (id, channels) in outputs.iter().enumerate() {
            for channel in channels {
                if !routes.contains_key(&(NodeId(id), channel.clone())) {
                    return Err(EtlError::routing(format!(
                        "channel '{}' of node '{}' is not wired",
                        channel, names[id]
                    ))
                    .into());
                }
            }
        }

        let order = topological_order(&successors)
            .ok_or_else(|| EtlError::routing("pipeline graph contains a cycle"))?;

        log::debug!(
            "Built pipeline: {} nodes, {} wires, {} outputs",
            names.len(),
            self.wires.len(),
            self.outputs.len()
        );

        Ok(Pipeline {
            nodes: self
                .nodes
                .into_iter()
                .map(|node| {
                    RefCell::new(Slot {
                        node,
                        state: NodeState::Created,
                    })
                })
                .collect(),
            names,
            routes,
            order,
        })
    }
}

/// Kahn's algorithm, ties broken by insertion order
fn topological_order(successors: &[Vec<usize>]) -> Option<Vec<NodeId>> {
    let mut in_degree = vec![0usize; successors.len()];
    for targets in successors {
        for &to in targets {
            in_degree[to] += 1;
        }
    }

    let mut ready: VecDeque<usize> = (0..successors.len())
        .filter(|&id| in_degree[id] == 0)
        .collect();
    let mut order = Vec::with_capacity(successors.len());

    while let Some(id) = ready.pop_front() {
        order.push(NodeId(id));
        for &to in &successors[id] {
            in_degree[to] -= 1;
            if in_degree[to] == 0 {
                ready.push_back(to);
            }
        }
    }

    (order.len() == successors.len()).then_some(order)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Created,
    Initialized,
    Finalized,
}

struct Slot {
    node: Node,
    state: NodeState,
}

/// Counters reported at the end of a run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    /// Rows pulled from source nodes
    pub extracted: usize,
    /// Rows handed to the loader
    pub loaded: usize,
    pub elapsed: Duration,
}

/// A validated, runnable graph of nodes
///
/// Execution is single-threaded and pull-driven: one source row is pulled,
/// pushed depth-first through every node it reaches, and only then is the
/// next source row pulled. Rows on a channel therefore keep their order from
/// producer to consumer, and at most one row per active node is in flight.
pub struct Pipeline {
    nodes: Vec<RefCell<Slot>>,
    names: Vec<String>,
    routes: HashMap<(NodeId, Channel), Vec<Destination>>,
    order: Vec<NodeId>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("nodes", &self.node_names())
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Node names in execution order
    pub fn node_names(&self) -> Vec<&str> {
        self.order.iter().map(|id| self.names[id.0].as_str()).collect()
    }

    /// Run the pipeline to completion
    ///
    /// Steps:
    /// 1. Initialize every node in topological order
    /// 2. Pull source rows one at a time and route them through the graph
    /// 3. Finalize every node in topological order, routing its output
    /// 4. Finish the loader
    ///
    /// Consumes the pipeline: nodes hold per-run state.
    ///
    /// # Errors
    /// Returns the first error raised by a node or the loader. Every node that
    /// was initialized is still finalized exactly once; its output is discarded.
    pub fn run<L: Loader>(self, loader: &mut L) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary::default();
        log::info!("Starting pipeline with {} nodes", self.nodes.len());

        let outcome = self
            .execute(loader, &mut summary)
            .and_then(|()| loader.finish());

        if let Err(err) = outcome {
            self.abort();
            return Err(err);
        }

        summary.elapsed = started.elapsed();
        log::info!(
            "Pipeline complete: extracted {} rows, loaded {} rows in {:.3}s",
            summary.extracted,
            summary.loaded,
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    /// Run and collect every exposed row
    pub fn collect(self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.run(&mut rows)?;
        Ok(rows)
    }

    fn execute(&self, loader: &mut dyn Loader, summary: &mut RunSummary) -> Result<()> {
        for &id in &self.order {
            let mut slot = self.nodes[id.0].borrow_mut();
            let initialized = match &mut slot.node {
                Node::Source(source) => source.initialize(),
                Node::Transform(transformer) => transformer.initialize(),
            };
            initialized
                .with_context(|| format!("Failed to initialize node '{}'", self.names[id.0]))?;
            slot.state = NodeState::Initialized;
        }

        for &id in &self.order {
            let mut slot = self.nodes[id.0].borrow_mut();
            let Node::Source(source) = &mut slot.node else {
                continue;
            };
            log::debug!("Extracting from '{}'", self.names[id.0]);
            for row in source.extract() {
                let row = row
                    .with_context(|| format!("Extraction failed in '{}'", self.names[id.0]))?;
                summary.extracted += 1;
                self.route(id, Emit::main(row), loader, summary)?;
            }
        }

        for &id in &self.order {
            self.finalize_node(id, loader, summary)?;
        }
        Ok(())
    }

    fn finalize_node(
        &self,
        id: NodeId,
        loader: &mut dyn Loader,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let mut slot = self.nodes[id.0].borrow_mut();
        if slot.state != NodeState::Initialized {
            return Ok(());
        }
        slot.state = NodeState::Finalized;
        let name = &self.names[id.0];

        match &mut slot.node {
            Node::Source(source) => source
                .finalize()
                .with_context(|| format!("Failed to finalize node '{name}'")),
            Node::Transform(transformer) => {
                for emit in transformer.finalize() {
                    let emit = emit.with_context(|| format!("Failed to finalize node '{name}'"))?;
                    self.route(id, emit, loader, summary)?;
                }
                Ok(())
            }
        }
    }

    /// Finalize whatever is still open after a failure, discarding output
    fn abort(&self) {
        for &id in &self.order {
            let Ok(mut slot) = self.nodes[id.0].try_borrow_mut() else {
                continue;
            };
            if slot.state != NodeState::Initialized {
                continue;
            }
            slot.state = NodeState::Finalized;
            let name = &self.names[id.0];

            match &mut slot.node {
                Node::Source(source) => {
                    if let Err(err) = source.finalize() {
                        log::warn!("Finalizing '{name}' after abort failed: {err}");
                    }
                }
                Node::Transform(transformer) => {
                    let mut discarded = 0;
                    for emit in transformer.finalize() {
                        match emit {
                            Ok(_) => discarded += 1,
                            Err(err) => {
                                log::warn!("Finalizing '{name}' after abort failed: {err}");
                                break;
                            }
                        }
                    }
                    if discarded > 0 {
                        log::warn!("Discarded {discarded} rows finalized by '{name}' after abort");
                    }
                }
            }
        }
    }

    fn route(
        &self,
        from: NodeId,
        emit: Emit,
        loader: &mut dyn Loader,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let Emit { row, channel } = emit;
        let destinations = self
            .routes
            .get(&(from, channel.clone()))
            .and_then(|d| d.split_last())
            .ok_or_else(|| {
                EtlError::routing(format!(
                    "node '{}' emitted on undeclared channel '{}'",
                    self.names[from.0], channel
                ))
            })?;

        let (last, rest) = destinations;
        for destination in rest {
            self.deliver(destination, row.clone(), &channel, loader, summary)?;
        }
        self.deliver(last, row, &channel, loader, summary)
    }

    fn deliver(
        &self,
        destination: &Destination,
        row: Row,
        channel: &Channel,
        loader: &mut dyn Loader,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let (id, input) = match destination {
            Destination::Output => {
                summary.loaded += 1;
                return loader.load(Emit::new(row, channel.clone()));
            }
            Destination::Node { id, input } => (*id, input),
        };

        let name = &self.names[id.0];
        let mut slot = self.nodes[id.0]
            .try_borrow_mut()
            .map_err(|_| EtlError::routing(format!("node '{name}' was re-entered")))?;
        if slot.state != NodeState::Initialized {
            return Err(EtlError::routing(format!("node '{name}' received a row while not running")).into());
        }
        let Node::Transform(transformer) = &mut slot.node else {
            return Err(EtlError::routing(format!("source '{name}' cannot receive rows")).into());
        };

        log::trace!("Delivering row to '{name}' on '{input}'");
        for emit in transformer.transform(row, input) {
            let emit = emit.with_context(|| format!("Transform failed in '{name}'"))?;
            self.route(id, emit, loader, summary)?;
        }
        Ok(())
    }
}
