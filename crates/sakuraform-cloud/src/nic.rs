//! NIC reconciliation
//!
//! Turns the actual interface list of an instance into the desired list of
//! connection targets. The remote API refuses to connect a NIC that is
//! already connected and refuses to delete a NIC that is still plugged into
//! a switch, so the plan is emitted in a fixed phase order:
//! disconnects → deletes → creates → connects.

use crate::client::RemoteResourceClient;
use crate::error::{CloudError, Result};
use crate::model::{ConnectionTarget, Interface, ResourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single NIC mutation, addressed by interface index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum NicOperation {
    Disconnect { index: usize, nic_id: ResourceId },
    Delete { index: usize, nic_id: ResourceId },
    /// The new NIC lands at `index` because creation always appends
    Create { index: usize },
    Connect { index: usize, target: ConnectionTarget },
}

impl NicOperation {
    pub fn index(&self) -> usize {
        match self {
            NicOperation::Disconnect { index, .. }
            | NicOperation::Delete { index, .. }
            | NicOperation::Create { index }
            | NicOperation::Connect { index, .. } => *index,
        }
    }
}

impl fmt::Display for NicOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NicOperation::Disconnect { index, nic_id } => {
                write!(f, "disconnect nic[{}] ({})", index, nic_id)
            }
            NicOperation::Delete { index, nic_id } => {
                write!(f, "delete nic[{}] ({})", index, nic_id)
            }
            NicOperation::Create { index } => write!(f, "create nic[{}]", index),
            NicOperation::Connect { index, target } => {
                write!(f, "connect nic[{}] to {}", index, target)
            }
        }
    }
}

/// Whether the actual interfaces already match the desired targets
///
/// A missing base interface counts as `none`.
pub fn connections_match(desired: &[ConnectionTarget], actual: &[Interface]) -> bool {
    let actual = sorted(actual);
    let desired_base = desired.first().cloned().unwrap_or_default();
    let actual_base = actual.first().map(|n| n.target.clone()).unwrap_or_default();

    let desired_extra = desired.get(1..).unwrap_or(&[]);
    let actual_extra = actual.get(1..).unwrap_or(&[]);

    desired_base == actual_base
        && desired_extra.len() == actual_extra.len()
        && desired_extra
            .iter()
            .zip(actual_extra)
            .all(|(want, nic)| *want == nic.target)
}

/// Compute the ordered operations turning `actual` into `desired`
///
/// Index 0 is never deleted, only reconnected. Equal inputs give an empty
/// plan.
pub fn plan(desired: &[ConnectionTarget], actual: &[Interface]) -> Vec<NicOperation> {
    let actual = sorted(actual);

    let mut disconnects = Vec::new();
    let mut deletes = Vec::new();
    let mut creates = Vec::new();
    let mut connects = Vec::new();

    let desired_base = desired.first().cloned().unwrap_or_default();
    let desired_extra = desired.get(1..).unwrap_or(&[]);

    match actual.first() {
        Some(base) if base.target != desired_base => {
            if base.target.is_connected() {
                disconnects.push(NicOperation::Disconnect {
                    index: 0,
                    nic_id: base.id.clone(),
                });
            }
            if desired_base.is_connected() {
                connects.push(NicOperation::Connect {
                    index: 0,
                    target: desired_base,
                });
            }
        }
        Some(_) => {}
        None => {
            if desired_base.is_connected() || !desired_extra.is_empty() {
                creates.push(NicOperation::Create { index: 0 });
                if desired_base.is_connected() {
                    connects.push(NicOperation::Connect {
                        index: 0,
                        target: desired_base,
                    });
                }
            }
        }
    }

    let actual_extra = actual.get(1..).unwrap_or(&[]);

    for (pos, nic) in actual_extra.iter().enumerate() {
        let index = pos + 1;
        let wanted = desired_extra.get(pos);
        let in_place = wanted == Some(&nic.target);

        if nic.target.is_connected() && !in_place {
            disconnects.push(NicOperation::Disconnect {
                index,
                nic_id: nic.id.clone(),
            });
        }

        match wanted {
            None => deletes.push(NicOperation::Delete {
                index,
                nic_id: nic.id.clone(),
            }),
            Some(target) if !in_place && target.is_connected() => {
                connects.push(NicOperation::Connect {
                    index,
                    target: target.clone(),
                });
            }
            Some(_) => {}
        }
    }

    // from the tail, so remaining indices never shift
    deletes.reverse();

    for (pos, target) in desired_extra.iter().enumerate().skip(actual_extra.len()) {
        let index = pos + 1;
        creates.push(NicOperation::Create { index });
        if target.is_connected() {
            connects.push(NicOperation::Connect {
                index,
                target: target.clone(),
            });
        }
    }

    disconnects
        .into_iter()
        .chain(deletes)
        .chain(creates)
        .chain(connects)
        .collect()
}

/// Run `ops` (as produced by [`plan`]) against instance `instance_id`
///
/// Stops at the first failure; completed operations stay in place.
pub async fn execute<C>(
    client: &C,
    instance_id: &str,
    actual: &[Interface],
    ops: &[NicOperation],
) -> Result<()>
where
    C: RemoteResourceClient + ?Sized,
{
    let mut ids: Vec<Option<ResourceId>> = sorted(actual)
        .into_iter()
        .map(|nic| Some(nic.id.clone()))
        .collect();

    for op in ops {
        tracing::info!("Instance {}: {}", instance_id, op);
        match op {
            NicOperation::Disconnect { nic_id, .. } => {
                client.disconnect_from_switch(nic_id).await?;
            }
            NicOperation::Delete { index, nic_id } => {
                client.delete_interface(nic_id).await?;
                if let Some(slot) = ids.get_mut(*index) {
                    *slot = None;
                }
            }
            NicOperation::Create { index } => {
                let created = client.create_interface(instance_id).await?;
                if ids.len() <= *index {
                    ids.resize(*index + 1, None);
                }
                ids[*index] = Some(created.id);
            }
            NicOperation::Connect { index, target } => {
                let nic_id = ids
                    .get(*index)
                    .and_then(|id| id.as_deref())
                    .ok_or_else(|| {
                        CloudError::ApiError(format!(
                            "instance {} has no interface at index {}",
                            instance_id, index
                        ))
                    })?;
                match target {
                    ConnectionTarget::Shared => client.connect_to_shared_segment(nic_id).await?,
                    ConnectionTarget::Switch(switch_id) => {
                        client.connect_to_switch(nic_id, switch_id).await?
                    }
                    ConnectionTarget::None => {}
                }
            }
        }
    }

    Ok(())
}

fn sorted(actual: &[Interface]) -> Vec<&Interface> {
    let mut nics: Vec<&Interface> = actual.iter().collect();
    nics.sort_by_key(|nic| nic.index);
    nics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sw(id: &str) -> ConnectionTarget {
        ConnectionTarget::Switch(id.to_string())
    }

    fn nics(targets: &[ConnectionTarget]) -> Vec<Interface> {
        targets
            .iter()
            .enumerate()
            .map(|(index, target)| Interface {
                id: format!("nic-{}", index),
                index,
                target: target.clone(),
                mac_address: format!("9c:a3:ba:00:00:{:02x}", index),
            })
            .collect()
    }

    /// Checks the ordering and safety invariants every plan must satisfy
    fn assert_well_formed(ops: &[NicOperation]) {
        let phase = |op: &NicOperation| match op {
            NicOperation::Disconnect { .. } => 0,
            NicOperation::Delete { .. } => 1,
            NicOperation::Create { .. } => 2,
            NicOperation::Connect { .. } => 3,
        };
        for pair in ops.windows(2) {
            assert!(phase(&pair[0]) <= phase(&pair[1]), "bad order: {:?}", ops);
        }
        assert!(
            !ops.iter()
                .any(|op| matches!(op, NicOperation::Delete { index: 0, .. })),
            "base nic deleted: {:?}",
            ops
        );
        let delete_indices: Vec<usize> = ops
            .iter()
            .filter(|op| matches!(op, NicOperation::Delete { .. }))
            .map(NicOperation::index)
            .collect();
        assert!(delete_indices.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_unchanged_yields_empty_plan() {
        let desired = vec![ConnectionTarget::Shared, sw("100")];
        let actual = nics(&desired);
        assert!(connections_match(&desired, &actual));
        assert!(plan(&desired, &actual).is_empty());
    }

    #[test]
    fn test_base_reconnected_not_deleted() {
        let actual = nics(&[ConnectionTarget::Shared]);
        let ops = plan(&[sw("200")], &actual);
        assert_eq!(
            ops,
            vec![
                NicOperation::Disconnect {
                    index: 0,
                    nic_id: "nic-0".to_string()
                },
                NicOperation::Connect {
                    index: 0,
                    target: sw("200")
                },
            ]
        );
    }

    #[test]
    fn test_empty_desired_disconnects_and_deletes_extras() {
        let actual = nics(&[ConnectionTarget::Shared, sw("1"), ConnectionTarget::None, sw("3")]);
        let ops = plan(&[], &actual);
        assert_eq!(
            ops,
            vec![
                NicOperation::Disconnect {
                    index: 0,
                    nic_id: "nic-0".to_string()
                },
                NicOperation::Disconnect {
                    index: 1,
                    nic_id: "nic-1".to_string()
                },
                NicOperation::Disconnect {
                    index: 3,
                    nic_id: "nic-3".to_string()
                },
                NicOperation::Delete {
                    index: 3,
                    nic_id: "nic-3".to_string()
                },
                NicOperation::Delete {
                    index: 2,
                    nic_id: "nic-2".to_string()
                },
                NicOperation::Delete {
                    index: 1,
                    nic_id: "nic-1".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_retarget_and_grow() {
        let actual = nics(&[ConnectionTarget::Shared, sw("1")]);
        let desired = vec![ConnectionTarget::Shared, sw("2"), ConnectionTarget::None, sw("4")];
        let ops = plan(&desired, &actual);
        assert_eq!(
            ops,
            vec![
                NicOperation::Disconnect {
                    index: 1,
                    nic_id: "nic-1".to_string()
                },
                NicOperation::Create { index: 2 },
                NicOperation::Create { index: 3 },
                NicOperation::Connect {
                    index: 1,
                    target: sw("2")
                },
                NicOperation::Connect {
                    index: 3,
                    target: sw("4")
                },
            ]
        );
    }

    #[test]
    fn test_desired_none_on_existing_nic_only_disconnects() {
        let actual = nics(&[ConnectionTarget::Shared, sw("1")]);
        let ops = plan(&[ConnectionTarget::Shared, ConnectionTarget::None], &actual);
        assert_eq!(
            ops,
            vec![NicOperation::Disconnect {
                index: 1,
                nic_id: "nic-1".to_string()
            }]
        );
    }

    #[test]
    fn test_missing_base_is_created_first() {
        let ops = plan(&[ConnectionTarget::Shared, sw("9")], &[]);
        assert_eq!(
            ops,
            vec![
                NicOperation::Create { index: 0 },
                NicOperation::Create { index: 1 },
                NicOperation::Connect {
                    index: 0,
                    target: ConnectionTarget::Shared
                },
                NicOperation::Connect {
                    index: 1,
                    target: sw("9")
                },
            ]
        );
        assert!(plan(&[], &[]).is_empty());
        assert!(plan(&[ConnectionTarget::None], &[]).is_empty());
    }

    #[test]
    fn test_plan_invariants_over_small_inputs() {
        let base_choices = [ConnectionTarget::None, ConnectionTarget::Shared, sw("a")];
        let extra_choices = [ConnectionTarget::None, sw("a"), sw("b")];

        // every list of up to three entries: base + up to two extras
        let mut lists: Vec<Vec<ConnectionTarget>> = vec![vec![]];
        for base in &base_choices {
            lists.push(vec![base.clone()]);
            for e1 in &extra_choices {
                lists.push(vec![base.clone(), e1.clone()]);
                for e2 in &extra_choices {
                    lists.push(vec![base.clone(), e1.clone(), e2.clone()]);
                }
            }
        }

        for desired in &lists {
            for current in lists.iter().filter(|l| !l.is_empty()) {
                let actual = nics(current);
                let ops = plan(desired, &actual);
                assert_well_formed(&ops);
                assert_eq!(ops.is_empty(), connections_match(desired, &actual));
            }
        }
    }
}
