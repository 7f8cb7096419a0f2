//! Call-graph linking.
//!
//! Turns call records into Value and Call nodes:
//!
//! ```text
//! Call --calls--> Method/Function/Property/Class
//! Call --receiver--> Value
//! Call --argument{position}--> Value
//! Call --produces--> Value
//! Value --assigned_from--> Value
//! Value --type_of--> Class/Interface/...
//! Method/Function/File --contains--> Call | Value
//! ```
//!
//! A record's declared shape is reconciled with the callee symbol before
//! anything is emitted, so a callee that decodes to a method is never
//! reported as a property access.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use kloc_core::calls::{CallRecord, CallShape, CallsData, ReceiverKind, ValueKind, ValueRecord};
use kloc_core::graph::{Edge, EdgeType, Node, NodeKind, Range};
use kloc_core::ids::NodeId;

use crate::builder::GraphBuilder;
use crate::metadata::MetadataTable;
use crate::spatial::SpatialIndex;
use crate::symbol::{Descriptor, ParsedSymbol, SymbolDecoder};

static PARAMETER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\((\$?[A-Za-z_][A-Za-z0-9_]*)\)").expect("static regex")
});
static LOCAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.local\$([A-Za-z_][A-Za-z0-9_]*)@").expect("static regex"));
static PROPERTY_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\$([A-Za-z_][A-Za-z0-9_]*)\.?$").expect("static regex"));

// ============================================================================
// Naming
// ============================================================================

/// Display name of a value: the variable name when the symbol carries one,
/// else a placeholder for its kind.
fn value_name(value: &ValueRecord) -> String {
    if let Some(symbol) = value.symbol.as_deref() {
        for pattern in [&*PARAMETER_NAME, &*LOCAL_NAME, &*PROPERTY_NAME] {
            if let Some(name) = pattern.captures(symbol).and_then(|c| c.get(1)) {
                let name = name.as_str();
                if name.starts_with('$') {
                    return name.to_string();
                }
                return format!("${}", name);
            }
        }
    }
    match value.kind {
        ValueKind::Result => "(result)".to_string(),
        ValueKind::Literal => "(literal)".to_string(),
        ValueKind::Constant => "(constant)".to_string(),
        ValueKind::Parameter | ValueKind::Local | ValueKind::Unknown => "$unknown".to_string(),
    }
}

/// Symbol of the callable a parameter or local belongs to:
/// `App/A#run().($x)` -> `App/A#run().`.
fn value_scope(symbol: &str) -> Option<&str> {
    symbol
        .rfind(".($")
        .or_else(|| symbol.rfind(".local$"))
        .map(|idx| &symbol[..=idx])
}

/// Display name of a call site.
fn call_name(call: &CallRecord, shape: CallShape) -> String {
    let last = call
        .callee
        .as_deref()
        .and_then(|callee| ParsedSymbol::parse(callee).ok())
        .map(|parsed| parsed.last().clone());

    match (last, shape) {
        (Some(Descriptor::Method { name, .. }), shape) if shape.is_invocation() => {
            format!("{}()", name)
        }
        (Some(Descriptor::Method { name, .. }), _) => name,
        (Some(Descriptor::Term(name)), _) => name.trim_start_matches('$').to_string(),
        (Some(Descriptor::Type(name)), CallShape::Constructor) => format!("new {}()", name),
        _ => match (shape, call.return_type.as_deref()) {
            (CallShape::Constructor, Some(ty)) => match ParsedSymbol::parse(ty) {
                Ok(parsed) => format!("new {}()", parsed.last().name()),
                Err(_) => "(call)".to_string(),
            },
            _ => "(call)".to_string(),
        },
    }
}

// ============================================================================
// Shape reconciliation
// ============================================================================

/// Reconcile a declared shape with the kind the callee decodes to.
pub fn reconcile_shape(declared: CallShape, callee: Option<NodeKind>) -> CallShape {
    match declared {
        CallShape::Function
        | CallShape::Method
        | CallShape::MethodStatic
        | CallShape::Constructor => declared,
        CallShape::Access => match callee {
            Some(NodeKind::Method) => CallShape::Method,
            Some(NodeKind::Function) => CallShape::Function,
            _ => CallShape::Access,
        },
        CallShape::AccessStatic => match callee {
            Some(NodeKind::Method) => CallShape::MethodStatic,
            Some(NodeKind::Function) => CallShape::Function,
            _ => CallShape::AccessStatic,
        },
        CallShape::Unknown => match callee {
            Some(NodeKind::Method) => CallShape::Method,
            Some(NodeKind::Function) => CallShape::Function,
            Some(NodeKind::Property | NodeKind::Constant | NodeKind::EnumCase) => CallShape::Access,
            Some(kind) if kind.is_type_like() => CallShape::Constructor,
            _ => CallShape::Unknown,
        },
    }
}

// ============================================================================
// Linker
// ============================================================================

struct Linker<'a> {
    data: &'a CallsData,
    decoder: &'a SymbolDecoder,
    metadata: &'a MetadataTable,
    spatial: &'a SpatialIndex,
    values: HashMap<&'a str, &'a ValueRecord>,
    producers: HashMap<&'a str, &'a CallRecord>,
    shapes: HashMap<&'a str, CallShape>,
    unresolved: usize,
}

impl<'a> Linker<'a> {
    fn new(
        data: &'a CallsData,
        decoder: &'a SymbolDecoder,
        metadata: &'a MetadataTable,
        spatial: &'a SpatialIndex,
    ) -> Self {
        Linker {
            data,
            decoder,
            metadata,
            spatial,
            values: data.values_by_id(),
            producers: data.calls_by_result(),
            shapes: HashMap::new(),
            unresolved: 0,
        }
    }

    /// Kind of a symbol: its node's kind, else what the grammar says.
    fn kind_of(&self, builder: &GraphBuilder, symbol: &str) -> Option<NodeKind> {
        match builder.resolve_loose(symbol) {
            Some(id) => builder.node(&id).map(|n| n.kind),
            None => self.decoder.decode(symbol, self.metadata).ok().map(|d| d.kind),
        }
    }

    /// FQN of a symbol: its node's FQN, else the decoded FQN.
    fn fqn_of(&self, builder: &GraphBuilder, symbol: &str) -> Option<String> {
        match builder.resolve_loose(symbol) {
            Some(id) => builder.node(&id).map(|n| n.fqn.clone()),
            None => self.decoder.decode(symbol, self.metadata).ok().map(|d| d.fqn),
        }
    }

    fn resolve_shapes(&mut self, builder: &GraphBuilder) {
        let data = self.data;
        for call in &data.calls {
            if call.id.is_empty() || self.shapes.contains_key(call.id.as_str()) {
                continue;
            }
            let callee_kind = call
                .callee
                .as_deref()
                .and_then(|callee| self.kind_of(builder, callee));
            let shape = reconcile_shape(call.kind, callee_kind);
            if shape != call.kind {
                trace!(call = %call.id, declared = %call.kind, resolved = %shape, "reconciled call shape");
            }
            self.shapes.insert(call.id.as_str(), shape);
        }
    }

    /// Kind of a call's immediate receiver.
    fn receiver_kind(&self, call: &CallRecord) -> Option<ReceiverKind> {
        let receiver = call.receiver_value_id.as_deref()?;
        if let Some(producer) = self.producers.get(receiver) {
            if producer.id != call.id {
                let shape = self
                    .shapes
                    .get(producer.id.as_str())
                    .copied()
                    .unwrap_or(producer.kind);
                return Some(ReceiverKind::from(shape));
            }
        }
        self.values
            .get(receiver)
            .map(|value| ReceiverKind::from(value.kind))
    }

    fn value_node(&self, builder: &GraphBuilder, value: &ValueRecord) -> Node {
        let name = value_name(value);
        let location = &value.location;

        let scope_fqn = value
            .symbol
            .as_deref()
            .and_then(value_scope)
            .and_then(|scope| self.fqn_of(builder, scope));
        let fqn = match scope_fqn {
            Some(scope) => format!("{}::{}", scope, name),
            None => format!("{}:{}:{}", location.file, location.line, name),
        };

        let end_col = location.col.saturating_add(name.len() as u32);
        let mut node = Node::new(
            NodeId::for_value(&value.id),
            NodeKind::Value,
            name,
            fqn,
            value.symbol.clone().unwrap_or_default(),
        )
        .with_range(Range::new(location.line, location.col, location.line, end_col));
        if !location.file.is_empty() {
            node = node.with_file(location.file.clone());
        }
        node.value_kind = Some(value.kind);
        node.type_symbol = value.type_symbol.clone();
        node
    }

    fn call_node(&self, builder: &GraphBuilder, call: &CallRecord) -> Node {
        let shape = self
            .shapes
            .get(call.id.as_str())
            .copied()
            .unwrap_or(call.kind);
        let name = call_name(call, shape);
        let location = &call.location;

        let fqn = match call
            .caller
            .as_deref()
            .and_then(|caller| self.fqn_of(builder, caller))
        {
            Some(caller) => format!("{}@{}:{}", caller, location.line, location.col),
            None => format!("{}:{}:{}", location.file, location.line, location.col),
        };

        let end_col = location.col.saturating_add(name.len() as u32);
        let mut node = Node::new(NodeId::for_call(&call.id), NodeKind::Call, name, fqn, "")
            .with_range(Range::new(location.line, location.col, location.line, end_col));
        if !location.file.is_empty() {
            node = node.with_file(location.file.clone());
        }
        node.call_kind = Some(shape);
        node.receiver_kind = self.receiver_kind(call);
        node
    }

    /// Node that contains a record: the named scope, else the innermost
    /// scope at the location, else the file.
    fn container(&self, builder: &GraphBuilder, scope: Option<&str>, file: &str, line: u32) -> Option<NodeId> {
        scope
            .and_then(|symbol| builder.resolve_loose(symbol))
            .or_else(|| self.spatial.enclosing(file, line).cloned())
            .or_else(|| builder.file_node(file).cloned())
    }

    fn resolve(&mut self, builder: &GraphBuilder, symbol: &str) -> Option<NodeId> {
        let resolved = builder.resolve_loose(symbol);
        if resolved.is_none() {
            trace!(symbol, "unresolved call target");
            self.unresolved += 1;
        }
        resolved
    }

    fn link_values(&mut self, builder: &mut GraphBuilder) -> usize {
        let data = self.data;
        let mut created = 0usize;
        for value in &data.values {
            if value.id.is_empty() {
                continue;
            }
            let id = NodeId::for_value(&value.id);
            if builder.node(&id).is_some() {
                continue;
            }
            if !value.location.file.is_empty() {
                builder.ensure_file(&value.location.file);
            }
            let node = self.value_node(builder, value);
            builder.add_node(node);
            created += 1;

            let scope = value.symbol.as_deref().and_then(value_scope);
            if let Some(parent) =
                self.container(builder, scope, &value.location.file, value.location.line)
            {
                builder.add_edge(Edge::new(EdgeType::Contains, parent, id.clone()));
            }

            if let Some(source) = value.source_value_id.as_deref() {
                if source != value.id && self.values.contains_key(source) {
                    builder.add_edge(Edge::new(EdgeType::AssignedFrom, id.clone(), NodeId::for_value(source)));
                }
            }

            if let Some(type_symbol) = value.type_symbol.as_deref() {
                if let Some(target) = self.resolve(builder, type_symbol) {
                    builder.add_edge(Edge::new(EdgeType::TypeOf, id.clone(), target));
                }
            }
        }
        created
    }

    fn link_calls(&mut self, builder: &mut GraphBuilder) -> usize {
        let data = self.data;
        let mut created = 0usize;
        for call in &data.calls {
            if call.id.is_empty() {
                continue;
            }
            let id = NodeId::for_call(&call.id);
            if builder.node(&id).is_some() {
                continue;
            }
            if !call.location.file.is_empty() {
                builder.ensure_file(&call.location.file);
            }
            let node = self.call_node(builder, call);
            let shape = node.call_kind.unwrap_or(call.kind);
            builder.add_node(node);
            created += 1;

            let location = call.location.to_location();

            if let Some(parent) = self.container(
                builder,
                call.caller.as_deref(),
                &call.location.file,
                call.location.line,
            ) {
                builder.add_edge(Edge::new(EdgeType::Contains, parent, id.clone()));
            }

            // Constructors may name only the class they build.
            let mut candidates: Vec<&str> = call.callee.as_deref().into_iter().collect();
            if shape == CallShape::Constructor {
                candidates.extend(call.return_type.as_deref());
            }
            let target = candidates
                .iter()
                .find_map(|symbol| builder.resolve_loose(symbol));
            if target.is_none() && !candidates.is_empty() {
                trace!(call = %call.id, "unresolved call target");
                self.unresolved += 1;
            }
            if let Some(target) = target {
                builder.add_edge(
                    Edge::new(EdgeType::Calls, id.clone(), target).with_location(location.clone()),
                );
            }

            if let Some(receiver) = call.receiver_value_id.as_deref() {
                if self.values.contains_key(receiver) {
                    builder.add_edge(Edge::new(EdgeType::Receiver, id.clone(), NodeId::for_value(receiver)));
                }
            }

            for argument in &call.arguments {
                let Some(value) = self.values.get(argument.value_id.as_str()) else {
                    continue;
                };
                let arg_location = if value.location.file.is_empty() {
                    location.clone()
                } else {
                    value.location.to_location()
                };
                builder.add_edge(
                    Edge::new(EdgeType::Argument, id.clone(), NodeId::for_value(&value.id))
                        .with_position(argument.position)
                        .with_location(arg_location),
                );
            }

            if self.values.contains_key(call.result_id()) {
                builder.add_edge(Edge::new(
                    EdgeType::Produces,
                    id.clone(),
                    NodeId::for_value(call.result_id()),
                ));
            }
        }
        created
    }
}

/// Add Value and Call nodes and their edges. Runs after every other pass.
pub fn link_calls(
    data: &CallsData,
    builder: &mut GraphBuilder,
    spatial: &SpatialIndex,
    decoder: &SymbolDecoder,
    metadata: &MetadataTable,
) {
    let mut linker = Linker::new(data, decoder, metadata, spatial);
    linker.resolve_shapes(builder);
    let values = linker.link_values(builder);
    let calls = linker.link_calls(builder);
    builder.diagnostics.unresolved_targets += linker.unresolved;
    debug!(values, calls, unresolved = linker.unresolved, "linked call records");
}
