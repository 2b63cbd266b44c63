use std::collections::HashSet;

use shop_types::ItemId;

use crate::events::{EventRecord, ShopEvent};

/// Result of validating an event log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub record_count: u64,
    pub hash_chain_valid: bool,
    pub sequence_monotonic: bool,
    pub items_attributed: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub seq: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    SequenceGap,
    HashChainBreak,
    HashMismatch,
    /// An update or purchase names an item no earlier record created.
    UnknownItem,
    /// Items must be created with ids 1, 2, 3, ...
    NonSequentialId,
}

/// Event log integrity validator.
pub struct EventChainValidator;

impl EventChainValidator {
    pub fn validate(records: &[EventRecord]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut hash_chain_valid = true;
        let mut sequence_monotonic = true;
        let mut items_attributed = true;
        let mut created = HashSet::new();
        let mut next_id = 1u64;

        for (index, record) in records.iter().enumerate() {
            let expected_seq = (index + 1) as u64;
            if record.seq != expected_seq {
                sequence_monotonic = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::SequenceGap,
                    description: format!("expected seq {expected_seq}, got {}", record.seq),
                });
            }

            let expected_prev = index.checked_sub(1).map(|prev| records[prev].hash);
            if record.prev_hash != expected_prev {
                hash_chain_valid = false;
                violations.push(Violation {
                    seq: record.seq,
                    kind: ViolationKind::HashChainBreak,
                    description: "previous hash link mismatch".into(),
                });
            }

            // An encoding failure here cannot be a tampered record, so it is
            // not reported as a mismatch.
            if let Ok(computed) = record.compute_hash() {
                if computed != record.hash {
                    hash_chain_valid = false;
                    violations.push(Violation {
                        seq: record.seq,
                        kind: ViolationKind::HashMismatch,
                        description: "record hash does not match computed".into(),
                    });
                }
            }

            match &record.event {
                ShopEvent::ItemCreated { id, .. } => {
                    if id.get() != next_id {
                        items_attributed = false;
                        violations.push(Violation {
                            seq: record.seq,
                            kind: ViolationKind::NonSequentialId,
                            description: format!("expected item #{next_id}, created {id}"),
                        });
                    }
                    next_id = id.get().saturating_add(1);
                    created.insert(*id);
                }
                other => {
                    let id: ItemId = other.item_id();
                    if !created.contains(&id) {
                        items_attributed = false;
                        violations.push(Violation {
                            seq: record.seq,
                            kind: ViolationKind::UnknownItem,
                            description: format!("{} references uncreated item {id}", other.kind()),
                        });
                    }
                }
            }
        }

        ValidationReport {
            record_count: records.len() as u64,
            hash_chain_valid,
            sequence_monotonic,
            items_attributed,
            violations,
        }
    }
}
