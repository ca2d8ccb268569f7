//! RDF lists: `rdf:first`/`rdf:rest` chains terminated by `rdf:nil`.
//!
//! A list is identified by its head cell. Every operation walks the chain,
//! so `size` and indexed access are linear. Mutations keep the head cell
//! where they can; inserting in front of a cell moves that cell's contents
//! into a new cell and stores the new value in place. The nil list has no
//! cell to reuse, so operations that grow it return a new head.

use crate::error::ModelError;
use crate::model::{Graph, ResourceId, ResourceKind, Value};
use crate::vocab::rdf;

/// Typed view of a list cell (or of `rdf:nil`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListResource(ResourceId);

impl ListResource {
    /// Builds a list from `items`; an empty iterator yields `rdf:nil`.
    pub fn create(
        graph: &mut Graph,
        items: impl IntoIterator<Item = Value>,
    ) -> Result<Self, ModelError> {
        let items: Vec<Value> = items.into_iter().collect();
        let mut head = graph.nil();
        for item in items.into_iter().rev() {
            head = new_cell(graph, item, head)?;
        }
        Ok(Self(head))
    }

    /// The empty list.
    pub fn nil(graph: &Graph) -> Self {
        Self(graph.nil())
    }

    /// Views a resource as a list. Accepts `rdf:nil`, list-kind resources and
    /// any resource carrying `rdf:first`.
    pub fn from_resource(graph: &Graph, id: ResourceId) -> Result<Self, ModelError> {
        if graph.is_nil(id)
            || graph.kind(id) == ResourceKind::List
            || graph.first_value(id, rdf::FIRST).is_some()
        {
            Ok(Self(id))
        } else {
            Err(ModelError::WrongKind {
                resource: graph.describe(id),
                expected: ResourceKind::List.name(),
            })
        }
    }

    /// The head cell.
    pub fn id(self) -> ResourceId {
        self.0
    }

    pub fn is_nil(self, graph: &Graph) -> bool {
        graph.is_nil(self.0)
    }

    /// The head element.
    pub fn first(self, graph: &Graph) -> Option<&Value> {
        graph.first_value(self.0, rdf::FIRST)
    }

    /// The tail.
    pub fn rest(self, graph: &Graph) -> Option<ListResource> {
        graph
            .first_value(self.0, rdf::REST)
            .and_then(Value::as_resource)
            .map(ListResource)
    }

    /// Number of elements.
    pub fn size(self, graph: &Graph) -> usize {
        self.iter(graph).count()
    }

    /// Element at `index`.
    pub fn get(self, graph: &Graph, index: usize) -> Result<&Value, ModelError> {
        self.iter(graph)
            .nth(index)
            .ok_or_else(|| ModelError::IndexOutOfBounds {
                index,
                size: self.size(graph),
            })
    }

    /// Iterates over the elements.
    pub fn iter(self, graph: &Graph) -> ListIter<'_> {
        ListIter {
            graph,
            cell: Some(self.0),
            remaining: graph.len(),
        }
    }

    /// Copies the elements into a vector.
    pub fn items(self, graph: &Graph) -> Vec<Value> {
        self.iter(graph).cloned().collect()
    }

    /// Replaces the element at `index`, returning the old one.
    pub fn set(self, graph: &mut Graph, index: usize, value: Value) -> Result<Value, ModelError> {
        if self.is_nil(graph) {
            return Err(ModelError::NilList);
        }
        let cell = self.cell_at(graph, index)?;
        let old = self.element(graph, cell)?;
        set_link(graph, cell, rdf::FIRST, value)?;
        Ok(old)
    }

    /// Inserts `value` before position `index` (`index == size` appends).
    /// Returns the head of the resulting list.
    pub fn insert(
        self,
        graph: &mut Graph,
        index: usize,
        value: Value,
    ) -> Result<ListResource, ModelError> {
        let size = self.size(graph);
        if index > size {
            return Err(ModelError::IndexOutOfBounds { index, size });
        }

        if index == size {
            let nil = graph.nil();
            let cell = new_cell(graph, value, nil)?;
            if index == 0 {
                return Ok(ListResource(cell));
            }
            let last = self.cell_at(graph, index - 1)?;
            set_link(graph, last, rdf::REST, Value::Resource(cell))?;
            return Ok(self);
        }

        let cell = self.cell_at(graph, index)?;
        let old_first = self.element(graph, cell)?;
        let old_rest = self.next(graph, cell)?;
        let moved = new_cell(graph, old_first, old_rest)?;
        set_link(graph, cell, rdf::FIRST, value)?;
        set_link(graph, cell, rdf::REST, Value::Resource(moved))?;
        Ok(self)
    }

    /// Appends `value`, returning the head of the resulting list.
    pub fn add(self, graph: &mut Graph, value: Value) -> Result<ListResource, ModelError> {
        let size = self.size(graph);
        self.insert(graph, size, value)
    }

    /// Removes the element at `index`. Returns the head of the resulting
    /// list and the removed element.
    pub fn remove(
        self,
        graph: &mut Graph,
        index: usize,
    ) -> Result<(ListResource, Value), ModelError> {
        if self.is_nil(graph) {
            return Err(ModelError::NilList);
        }
        let size = self.size(graph);
        if index >= size {
            return Err(ModelError::IndexOutOfBounds { index, size });
        }

        let cell = self.cell_at(graph, index)?;
        let removed = self.element(graph, cell)?;
        let next = self.next(graph, cell)?;

        if graph.is_nil(next) {
            graph.clear_properties(cell);
            if index == 0 {
                return Ok((ListResource(next), removed));
            }
            let previous = self.cell_at(graph, index - 1)?;
            set_link(graph, previous, rdf::REST, Value::Resource(next))?;
        } else {
            // Pull the next cell's contents forward so the head keeps its identity.
            let next_first = self.element(graph, next)?;
            let next_rest = self.next(graph, next)?;
            set_link(graph, cell, rdf::FIRST, next_first)?;
            set_link(graph, cell, rdf::REST, Value::Resource(next_rest))?;
            graph.clear_properties(next);
        }
        Ok((self, removed))
    }

    fn cell_at(self, graph: &Graph, index: usize) -> Result<ResourceId, ModelError> {
        let mut cell = self.0;
        for _ in 0..index {
            cell = self.next(graph, cell)?;
        }
        if graph.is_nil(cell) {
            return Err(ModelError::IndexOutOfBounds {
                index,
                size: self.size(graph),
            });
        }
        Ok(cell)
    }

    fn element(self, graph: &Graph, cell: ResourceId) -> Result<Value, ModelError> {
        graph
            .first_value(cell, rdf::FIRST)
            .cloned()
            .ok_or_else(|| ModelError::BrokenList {
                resource: graph.describe(cell),
            })
    }

    fn next(self, graph: &Graph, cell: ResourceId) -> Result<ResourceId, ModelError> {
        graph
            .first_value(cell, rdf::REST)
            .and_then(Value::as_resource)
            .ok_or_else(|| ModelError::BrokenList {
                resource: graph.describe(cell),
            })
    }
}

/// Iterator over list elements. Stops at `rdf:nil`, at a broken cell, or
/// after visiting as many cells as the graph holds (cyclic chains).
pub struct ListIter<'g> {
    graph: &'g Graph,
    cell: Option<ResourceId>,
    remaining: usize,
}

impl<'g> Iterator for ListIter<'g> {
    type Item = &'g Value;

    fn next(&mut self) -> Option<Self::Item> {
        let cell = self.cell?;
        if self.graph.is_nil(cell) || self.remaining == 0 {
            self.cell = None;
            return None;
        }
        self.remaining -= 1;
        let first = self.graph.first_value(cell, rdf::FIRST);
        self.cell = self
            .graph
            .first_value(cell, rdf::REST)
            .and_then(Value::as_resource);
        if first.is_none() {
            self.cell = None;
        }
        first
    }
}

fn new_cell(graph: &mut Graph, first: Value, rest: ResourceId) -> Result<ResourceId, ModelError> {
    let cell = graph.create_resource(None, ResourceKind::List);
    graph.add_property_uri(cell, rdf::FIRST, first)?;
    graph.add_property_uri(cell, rdf::REST, Value::Resource(rest))?;
    Ok(cell)
}

fn set_link(
    graph: &mut Graph,
    cell: ResourceId,
    property_uri: &str,
    value: Value,
) -> Result<(), ModelError> {
    let property = graph.locate_resource(property_uri);
    graph.set_property(cell, property, value)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::model::{Literal, TypedLiteral};

    fn lit(s: &str) -> Value {
        Value::Literal(Literal::plain(s))
    }

    fn strings(graph: &Graph, list: ListResource) -> Vec<String> {
        list.iter(graph)
            .map(|v| v.as_literal().unwrap().lexical_form().to_string())
            .collect()
    }

    #[test]
    fn test_create_empty_is_nil() {
        let mut graph = Graph::new();
        let list = ListResource::create(&mut graph, []).unwrap();
        assert!(list.is_nil(&graph));
        assert_eq!(list.id(), graph.nil());
        assert_eq!(list.size(&graph), 0);
    }

    #[test]
    fn test_create_three_elements() {
        let mut graph = Graph::new();
        let list = ListResource::create(&mut graph, [lit("a"), lit("b"), lit("c")]).unwrap();

        assert_eq!(list.size(&graph), 3);
        assert_eq!(list.get(&graph, 1).unwrap(), &lit("b"));
        let tail = list
            .rest(&graph)
            .and_then(|l| l.rest(&graph))
            .and_then(|l| l.rest(&graph))
            .unwrap();
        assert!(tail.is_nil(&graph));
        assert!(matches!(
            list.get(&graph, 3),
            Err(ModelError::IndexOutOfBounds { index: 3, size: 3 })
        ));
    }

    #[test]
    fn test_insert_at_head_keeps_head_identity() {
        let mut graph = Graph::new();
        let list = ListResource::create(&mut graph, [lit("b"), lit("c")]).unwrap();
        let head = list.insert(&mut graph, 0, lit("a")).unwrap();
        assert_eq!(head, list);
        assert_eq!(strings(&graph, head), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_add_to_nil_returns_new_head() {
        let mut graph = Graph::new();
        let nil = ListResource::nil(&graph);
        let list = nil.add(&mut graph, lit("x")).unwrap();
        assert_ne!(list, nil);
        assert!(nil.is_nil(&graph));
        assert_eq!(strings(&graph, list), vec!["x"]);
        assert_eq!(graph.kind(list.id()), ResourceKind::List);
    }

    #[test]
    fn test_remove_and_set() {
        let mut graph = Graph::new();
        let list = ListResource::create(&mut graph, [lit("a"), lit("b"), lit("c")]).unwrap();

        let (list, removed) = list.remove(&mut graph, 0).unwrap();
        assert_eq!(removed, lit("a"));
        assert_eq!(strings(&graph, list), vec!["b", "c"]);

        assert_eq!(list.set(&mut graph, 1, lit("z")).unwrap(), lit("c"));
        let (list, _) = list.remove(&mut graph, 1).unwrap();
        let (list, _) = list.remove(&mut graph, 0).unwrap();
        assert!(list.is_nil(&graph));
        assert_eq!(list.remove(&mut graph, 0), Err(ModelError::NilList));
    }

    #[test]
    fn test_cyclic_chain_terminates() {
        let mut graph = Graph::new();
        let cell = graph.create_resource(None, ResourceKind::List);
        graph.add_property_uri(cell, rdf::FIRST, lit("loop")).unwrap();
        graph.add_property_uri(cell, rdf::REST, Value::Resource(cell)).unwrap();
        let list = ListResource::from_resource(&graph, cell).unwrap();
        assert!(list.size(&graph) <= graph.len());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(usize, i64),
        Add(i64),
        Remove(usize),
        Set(usize, i64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..8, any::<i64>()).prop_map(|(i, v)| Op::Insert(i, v)),
            any::<i64>().prop_map(Op::Add),
            (0usize..8).prop_map(Op::Remove),
            (0usize..8, any::<i64>()).prop_map(|(i, v)| Op::Set(i, v)),
        ]
    }

    proptest! {
        #[test]
        fn prop_list_behaves_like_vec(ops in prop::collection::vec(arb_op(), 0..24)) {
            let mut graph = Graph::new();
            let mut list = ListResource::nil(&graph);
            let mut model: Vec<i64> = Vec::new();

            for op in ops {
                let value = |v: i64| Value::Literal(TypedLiteral::integer(v).into());
                match op {
                    Op::Insert(i, v) if i <= model.len() => {
                        list = list.insert(&mut graph, i, value(v)).unwrap();
                        model.insert(i, v);
                    }
                    Op::Add(v) => {
                        list = list.add(&mut graph, value(v)).unwrap();
                        model.push(v);
                    }
                    Op::Remove(i) if i < model.len() => {
                        let (head, removed) = list.remove(&mut graph, i).unwrap();
                        list = head;
                        prop_assert_eq!(removed, value(model.remove(i)));
                    }
                    Op::Set(i, v) if i < model.len() => {
                        list.set(&mut graph, i, value(v)).unwrap();
                        model[i] = v;
                    }
                    _ => {
                        prop_assert!(list.get(&graph, model.len()).is_err());
                    }
                }
                let items: Vec<i64> = list
                    .iter(&graph)
                    .map(|v| match v {
                        Value::Literal(Literal::Typed(t)) => t.as_i64().unwrap(),
                        other => panic!("unexpected {other:?}"),
                    })
                    .collect();
                prop_assert_eq!(&items, &model);
            }
        }
    }
}
