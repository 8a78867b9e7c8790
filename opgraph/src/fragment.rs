use hashbrown::HashSet;
use log::debug;

use crate::abi::HostAbi;
use crate::error::{CapabilityKind, CapabilityResultExt, ValueError, ValueResult};
use crate::native::{Label, NativeBinding, NativeBlock, Stmt};
use crate::value_node::ValueNode;
use common::is_debug;

/// What a binding does on the normal exit path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terminal {
    /// Publish the native value back to the host slot.
    Sync,
    /// Release the native value, leaving the host slot untouched.
    Cleanup,
}

/// Code for one value node bound in a compiled region.
#[derive(Clone, Debug)]
pub struct ValueFragment {
    pub binding: NativeBinding,
    pub terminal: Terminal,
    pub declare: NativeBlock,
    pub extract: NativeBlock,
    /// Normal path: `sync` or `cleanup` depending on `terminal`.
    pub finish: NativeBlock,
    /// Failure path, always `cleanup`.
    pub cleanup: NativeBlock,
}

impl ValueFragment {
    /// Returns `None` when the node's kind cannot be compiled, in which case
    /// the caller runs the owning operation interpreted.
    ///
    /// `fail` is the extract failure target and runs this binding's cleanup.
    /// `sync_fail` is where a failing sync jumps; it must not run this binding's cleanup.
    pub fn emit(
        node: &ValueNode,
        binding: NativeBinding,
        fail: &Label,
        sync_fail: &Label,
        terminal: Terminal,
    ) -> ValueResult<Option<ValueFragment>> {
        let kind = node.kind();

        let Some(declare) = kind.declare(&binding).supported()? else {
            return Ok(fall_back(node, CapabilityKind::Declare));
        };
        let Some(extract) = kind.extract(&binding, fail).supported()? else {
            return Ok(fall_back(node, CapabilityKind::Extract));
        };
        let Some(cleanup) = kind.cleanup(&binding).supported()? else {
            return Ok(fall_back(node, CapabilityKind::Cleanup));
        };
        let finish = match terminal {
            Terminal::Cleanup => cleanup.clone(),
            Terminal::Sync => match kind.sync(&binding, sync_fail).supported()? {
                Some(sync) => sync,
                None => return Ok(fall_back(node, CapabilityKind::Sync)),
            },
        };

        Ok(Some(ValueFragment {
            binding,
            terminal,
            declare,
            extract,
            finish,
            cleanup,
        }))
    }
}

fn fall_back<T>(node: &ValueNode, capability: CapabilityKind) -> Option<T> {
    debug!(
        "Value {} ({}) has no {} hook, falling back to interpreted execution",
        node.name(),
        node.kind().type_name(),
        capability
    );
    None
}

/// Native build inputs for a set of value kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildRequirements {
    pub compile_args: Vec<String>,
    pub headers: Vec<String>,
    pub libraries: Vec<String>,
    pub support_code: Vec<String>,
}

impl BuildRequirements {
    /// Queries each distinct kind once, keeping first-seen order without duplicates.
    /// Kinds that do not provide a list contribute nothing.
    pub fn collect<'a>(nodes: impl IntoIterator<Item = &'a ValueNode>) -> ValueResult<Self> {
        let mut requirements = BuildRequirements::default();
        let mut seen_kinds: HashSet<String> = HashSet::new();

        for node in nodes {
            let kind = node.kind();
            if !seen_kinds.insert(kind.type_name().to_string()) {
                continue;
            }

            if let Some(args) = kind.compile_dependencies().supported()? {
                merge_unique(&mut requirements.compile_args, args);
            }
            if let Some(headers) = kind.headers().supported()? {
                merge_unique(&mut requirements.headers, headers);
            }
            if let Some(libraries) = kind.libraries().supported()? {
                merge_unique(&mut requirements.libraries, libraries);
            }
            if let Some(code) = kind.support_code().supported()? {
                merge_unique(&mut requirements.support_code, vec![code]);
            }
        }

        Ok(requirements)
    }
}

fn merge_unique(into: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !into.contains(&item) {
            into.push(item);
        }
    }
}

/// Assembled native code for a group of bindings around a body.
#[derive(Clone, Debug)]
pub struct Region {
    pub code: NativeBlock,
    /// Reached only when an extract or the body failed, after all cleanups ran.
    pub failed: Label,
    pub done: Label,
    pub requirements: BuildRequirements,
}

/// Lays out value fragments so every acquired resource is released exactly
/// once on every exit path.
///
/// ```text
/// declare 0..n
/// extract 0..n        extract i jumps to fail_i
/// body                jumps to fail_{n-1}
/// finish n-1..0       sync or cleanup
/// goto done
/// fail_{n-1}: cleanup n-1
/// ...
/// fail_0:     cleanup 0
/// failed:
/// done:
/// ```
///
/// A failing sync of binding i jumps to fail_{i-1} (or `failed`), so the
/// bindings not yet finished are cleaned up and binding i is not.
pub struct RegionBuilder<'a> {
    prefix: String,
    host_prefix: String,
    entries: Vec<(&'a ValueNode, NativeBinding, Terminal)>,
}

impl<'a> RegionBuilder<'a> {
    /// `prefix` namespaces the region's labels. `abi` is the one the region
    /// will be rendered with; its host slot names must not collide with native variables.
    pub fn new(prefix: impl Into<String>, abi: &HostAbi) -> ValueResult<Self> {
        let prefix = prefix.into();
        // validates the prefix as a label stem
        Label::new(format!("{prefix}_done"))?;

        Ok(RegionBuilder {
            prefix,
            host_prefix: abi.host_prefix.clone(),
            entries: Vec::new(),
        })
    }

    fn host_slot(&self, binding: &NativeBinding) -> String {
        format!("{}{}", self.host_prefix, binding)
    }

    pub fn bind(
        &mut self,
        node: &'a ValueNode,
        binding: NativeBinding,
        terminal: Terminal,
    ) -> ValueResult<&mut Self> {
        for (bound, bound_binding, _) in self.entries.iter() {
            if *bound == node {
                return Err(ValueError::InvalidArgument(format!(
                    "value {} is already bound as {}",
                    node.name(),
                    bound_binding
                )));
            }
            if *bound_binding == binding {
                return Err(ValueError::InvalidArgument(format!(
                    "binding {binding} is already used by {}",
                    bound.name()
                )));
            }
            if binding.as_str() == self.host_slot(bound_binding)
                || bound_binding.as_str() == self.host_slot(&binding)
            {
                return Err(ValueError::InvalidArgument(format!(
                    "binding {binding} collides with the host slot of {bound_binding}"
                )));
            }
        }
        self.entries.push((node, binding, terminal));

        Ok(self)
    }

    fn label(&self, suffix: &str) -> ValueResult<Label> {
        Label::new(format!("{}_{}", self.prefix, suffix))
    }

    /// `body` receives the label it must jump to on failure.
    /// Returns `None` when some bound node cannot be compiled.
    pub fn build<F>(self, body: F) -> ValueResult<Option<Region>>
    where
        F: FnOnce(&Label) -> NativeBlock,
    {
        let failed = self.label("failed")?;
        let done = self.label("done")?;

        let mut fragments = Vec::with_capacity(self.entries.len());
        let mut fail_labels = Vec::with_capacity(self.entries.len());
        for (index, (node, binding, terminal)) in self.entries.iter().enumerate() {
            let fail = self.label(&format!("fail_{index}"))?;
            let sync_fail = fail_labels.last().unwrap_or(&failed).clone();
            let Some(fragment) =
                ValueFragment::emit(node, binding.clone(), &fail, &sync_fail, *terminal)?
            else {
                debug!("Region {} is not compilable", self.prefix);
                return Ok(None);
            };
            fragments.push(fragment);
            fail_labels.push(fail);
        }

        let body_fail = fail_labels.last().unwrap_or(&failed).clone();

        let mut code = NativeBlock::new();
        for fragment in fragments.iter() {
            code.append(fragment.declare.clone());
        }
        for fragment in fragments.iter() {
            code.push(Stmt::Comment(format!("extract {}", fragment.binding)));
            code.append(fragment.extract.clone());
        }
        code.push(Stmt::Comment("body".to_string()));
        code.append(body(&body_fail));
        for fragment in fragments.iter().rev() {
            let action = match fragment.terminal {
                Terminal::Sync => "sync",
                Terminal::Cleanup => "cleanup",
            };
            code.push(Stmt::Comment(format!("{action} {}", fragment.binding)));
            code.append(fragment.finish.clone());
        }
        code.push(Stmt::Goto(done.clone()));

        for (fragment, fail) in fragments.iter().zip(fail_labels.iter()).rev() {
            code.push(Stmt::Label(fail.clone()));
            code.push(Stmt::Comment(format!("cleanup {}", fragment.binding)));
            code.append(fragment.cleanup.clone());
        }
        code.push(Stmt::Label(failed.clone()));
        code.push(Stmt::Label(done.clone()));

        if is_debug() {
            let mut labels = HashSet::new();
            for label in code.labels() {
                assert!(labels.insert(label), "Duplicate label {label} in region");
            }
        }

        let requirements = BuildRequirements::collect(self.entries.iter().map(|(node, _, _)| *node))?;
        debug!(
            "Region {} assembled: {} bindings, {} statements",
            self.prefix,
            fragments.len(),
            code.len()
        );

        Ok(Some(Region {
            code,
            failed,
            done,
            requirements,
        }))
    }
}
