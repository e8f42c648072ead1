// src/convert/order.rs

//! Dependency ordering of the input packages

use crate::error::{Error, Result};
use crate::packages::id::{Dependency, PackageId};
use std::collections::HashSet;

/// A package as seen by the ordering step
#[derive(Debug, Clone, Copy)]
pub struct OrderNode<'a> {
    pub id: &'a PackageId,
    pub dependencies: &'a [Dependency],
}

/// Linearize packages so every package comes after the packages it depends on
///
/// Returns indices into `nodes`. Roots are visited in input order, and each
/// dependency resolves to the first not yet placed package it matches, so
/// independent packages keep their relative input order. Dependencies that
/// match no input are ignored; they are expected to be installed already.
///
/// Reaching a package that is still being visited means the input contains a
/// cycle and fails the whole ordering.
pub fn linearize(nodes: &[OrderNode<'_>]) -> Result<Vec<usize>> {
    let mut placed = vec![false; nodes.len()];
    let mut order = Vec::with_capacity(nodes.len());

    for root in 0..nodes.len() {
        if placed[root] {
            continue;
        }

        // (node, index of the next dependency to look at)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        let mut in_progress = HashSet::from([root]);

        while let Some(frame) = stack.last_mut() {
            let (node, next_dependency) = *frame;

            match nodes[node].dependencies.get(next_dependency) {
                Some(dependency) => {
                    frame.1 += 1;

                    let target = (0..nodes.len()).find(|&i| !placed[i] && dependency.matches(nodes[i].id));
                    if let Some(target) = target {
                        if !in_progress.insert(target) {
                            return Err(Error::CyclicDependency(nodes[target].id.to_string()));
                        }
                        stack.push((target, 0));
                    }
                }
                None => {
                    stack.pop();
                    in_progress.remove(&node);
                    placed[node] = true;
                    order.push(node);
                }
            }
        }
    }

    Ok(order)
}
