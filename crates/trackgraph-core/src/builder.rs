use crate::error::CompileError;
use crate::node::NodeKind;
use crate::record::{ParsedRecord, Record, SensorDecl, SeparatorDecl};
use std::collections::{BTreeMap, HashMap};

/// A node as declared: successors and reverse are still names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDecl {
    pub name: String,
    pub reverse: String,
    pub kind: NodeKind<String>,
    /// Line of the record that declared the node.
    pub line: usize,
}

/// `dist` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistanceDecl {
    pub src: String,
    pub dest: String,
    pub millimeters: u32,
    pub line: usize,
}

/// `mutex` record: the seed edges of one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutexDecl {
    pub edges: Vec<(String, String)>,
    pub line: usize,
}

/// `calib` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalibrationStep {
    pub node: String,
    pub line: usize,
}

/// Position of a node in the final node array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Unused sensor address.
    Dummy,
    /// Index into the builder's declarations.
    Declared(usize),
}

/// Collects declarations keyed by name, before any name is resolved.
///
/// Two-phase lifecycle: registration (`add_record` / `register_node`), then
/// layout (`assign_identities`), after which the linker consumes it.
#[derive(Debug, Default)]
pub struct TrackBuilder {
    pub(crate) decls: Vec<NodeDecl>,
    by_name: HashMap<String, usize>,
    sensors_by_address: BTreeMap<u32, usize>,
    switches: Vec<usize>,
    ends: Vec<usize>,
    separators: Vec<usize>,
    pub(crate) distances: Vec<DistanceDecl>,
    pub(crate) mutexes: Vec<MutexDecl>,
    pub(crate) calibration: Vec<CalibrationStep>,
}

impl TrackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every record in order.
    pub fn from_records(records: impl IntoIterator<Item = ParsedRecord>) -> Result<Self, CompileError> {
        let mut builder = Self::new();
        for record in records {
            builder.add_record(record)?;
        }
        Ok(builder)
    }

    /// Register one record.
    pub fn add_record(&mut self, parsed: ParsedRecord) -> Result<(), CompileError> {
        let line = parsed.line;
        match parsed.record {
            Record::SensorPair { forward, backward } => {
                let reverse_of_forward = backward.name.clone();
                let reverse_of_backward = forward.name.clone();
                let a = self.register_sensor(forward, reverse_of_forward, line)?;
                let b = self.register_sensor(backward, reverse_of_backward, line)?;
                tracing::trace!(line, a, b, "sensor pair");
            }
            Record::SeparatorPair { forward, backward } => {
                let a = self.register_separator(&forward, &backward.name, line)?;
                let b = self.register_separator(&backward, &forward.name, line)?;
                self.separators.extend([a, b]);
            }
            Record::SwitchPair {
                branch,
                number,
                straight,
                curved,
                merge,
                merge_ahead,
            } => {
                let a = self.register_node(NodeDecl {
                    name: branch.clone(),
                    reverse: merge.clone(),
                    kind: NodeKind::Branch {
                        number,
                        straight,
                        curved,
                    },
                    line,
                })?;
                let b = self.register_node(NodeDecl {
                    name: merge,
                    reverse: branch,
                    kind: NodeKind::Merge {
                        number,
                        ahead: merge_ahead,
                    },
                    line,
                })?;
                self.switches.extend([a, b]);
            }
            Record::EnterPair { enter, ahead, exit } => {
                let a = self.register_node(NodeDecl {
                    name: enter.clone(),
                    reverse: exit.clone(),
                    kind: NodeKind::Enter { ahead },
                    line,
                })?;
                let b = self.register_node(NodeDecl {
                    name: exit,
                    reverse: enter,
                    kind: NodeKind::Exit,
                    line,
                })?;
                self.ends.extend([a, b]);
            }
            Record::Distance {
                src,
                dest,
                millimeters,
            } => self.distances.push(DistanceDecl {
                src,
                dest,
                millimeters,
                line,
            }),
            Record::Mutex { edges } => self.mutexes.push(MutexDecl { edges, line }),
            Record::CalibrationStep { node } => {
                self.calibration.push(CalibrationStep { node, line })
            }
        }
        Ok(())
    }

    fn register_sensor(
        &mut self,
        decl: SensorDecl,
        reverse: String,
        line: usize,
    ) -> Result<usize, CompileError> {
        if let Some(&existing) = self.sensors_by_address.get(&decl.address) {
            return Err(CompileError::DuplicateSensorAddress {
                address: decl.address,
                name: decl.name,
                existing: self.decls[existing].name.clone(),
                line,
            });
        }
        let address = decl.address;
        let index = self.register_node(NodeDecl {
            name: decl.name,
            reverse,
            kind: NodeKind::Sensor {
                address,
                ahead: decl.ahead,
            },
            line,
        })?;
        self.sensors_by_address.insert(address, index);
        Ok(index)
    }

    fn register_separator(
        &mut self,
        decl: &SeparatorDecl,
        reverse: &str,
        line: usize,
    ) -> Result<usize, CompileError> {
        self.register_node(NodeDecl {
            name: decl.name.clone(),
            reverse: reverse.to_string(),
            kind: NodeKind::Separator {
                ahead: decl.ahead.clone(),
            },
            line,
        })
    }

    /// Register a node under its name. Fails if the name is taken.
    ///
    /// Only records the declaration; layout class bookkeeping is done by the
    /// caller.
    pub fn register_node(&mut self, decl: NodeDecl) -> Result<usize, CompileError> {
        if self.by_name.contains_key(&decl.name) {
            return Err(CompileError::DuplicateNodeName {
                name: decl.name,
                line: decl.line,
            });
        }
        let index = self.decls.len();
        self.by_name.insert(decl.name.clone(), index);
        self.decls.push(decl);
        Ok(index)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn decl(&self, index: usize) -> Option<&NodeDecl> {
        self.decls.get(index)
    }

    pub fn decl_by_name(&self, name: &str) -> Option<&NodeDecl> {
        self.by_name.get(name).map(|&i| &self.decls[i])
    }

    pub fn declared_count(&self) -> usize {
        self.decls.len()
    }

    /// Declared sensors by ascending address.
    pub fn sensors(&self) -> impl Iterator<Item = (u32, &NodeDecl)> + '_ {
        self.sensors_by_address
            .iter()
            .map(|(&address, &i)| (address, &self.decls[i]))
    }

    /// Positions reserved for sensors: one per address up to the highest.
    pub fn sensor_slots(&self) -> usize {
        self.sensors_by_address
            .last_key_value()
            .map_or(0, |(&max, _)| max as usize + 1)
    }

    /// Length of the node array [`assign_identities`](Self::assign_identities)
    /// would produce, dummies included.
    pub fn slot_count(&self) -> usize {
        self.sensor_slots() + self.switches.len() + self.ends.len() + self.separators.len()
    }

    pub fn distances(&self) -> &[DistanceDecl] {
        &self.distances
    }

    pub fn mutexes(&self) -> &[MutexDecl] {
        &self.mutexes
    }

    pub fn calibration(&self) -> &[CalibrationStep] {
        &self.calibration
    }

    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Final node order: sensors by address with dummies in the gaps, then
    /// branches and merges, then enters and exits, then separators. A node's
    /// identity is its position in this list.
    pub fn assign_identities(&self) -> Vec<Slot> {
        let sensor_slots = self.sensor_slots();
        let mut order = Vec::with_capacity(self.slot_count());
        for address in 0..sensor_slots {
            match self.sensors_by_address.get(&(address as u32)) {
                Some(&i) => order.push(Slot::Declared(i)),
                None => order.push(Slot::Dummy),
            }
        }
        order.extend(self.switches.iter().map(|&i| Slot::Declared(i)));
        order.extend(self.ends.iter().map(|&i| Slot::Declared(i)));
        order.extend(self.separators.iter().map(|&i| Slot::Declared(i)));
        order
    }
}
