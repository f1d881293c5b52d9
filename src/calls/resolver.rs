//! Call resolver: layered strategies mapping a call-site name to the
//! `(kind, FQN)` of its target. Strategies run in fixed order; the
//! first one that lands on a registered FQN wins. An unresolved call
//! returns `None`, never an error.

use crate::definitions::functions::{IIFE_ARROW_PREFIX, IIFE_DIRECT_PREFIX, IIFE_FUNC_PREFIX};
use crate::state::{IndexState, ModuleImports};
use crate::symbol::SymbolKind;
use crate::typeinf::LocalTypes;
use crate::typeinf::python::infer_expression_type;

use super::builtins::{JS_BUILTIN_TYPES, builtin_prototype_method};

/// Read-only view over the run's state; never mutates the registry.
pub struct CallResolver<'s> {
    state: &'s IndexState,
}

impl<'s> CallResolver<'s> {
    pub fn new(state: &'s IndexState) -> Self {
        Self { state }
    }

    /// Main entry point for resolving a function or method call.
    pub fn resolve(
        &self,
        call_name: &str,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
        class_context: Option<&str>,
    ) -> Option<(SymbolKind, String)> {
        if call_name.is_empty() {
            return None;
        }

        if let Some(result) = self.try_iife(call_name, module_qn) {
            return Some(result);
        }

        if is_super_call(call_name) {
            return self.resolve_super_call(call_name, class_context);
        }

        if call_name.contains('.') && is_method_chain(call_name) {
            if let Some(result) = self.resolve_chained_call(call_name, module_qn, local_var_types)
            {
                return Some(result);
            }
        }

        if let Some(result) = self.try_via_imports(call_name, module_qn, local_var_types) {
            return Some(result);
        }

        if let Some(result) = self.try_same_module(call_name, module_qn) {
            return Some(result);
        }

        self.try_via_trie(call_name, module_qn)
    }

    /// Strategy 1: synthetic IIFE names live in the current module.
    fn try_iife(&self, call_name: &str, module_qn: &str) -> Option<(SymbolKind, String)> {
        if !(call_name.starts_with(IIFE_FUNC_PREFIX)
            || call_name.starts_with(IIFE_ARROW_PREFIX)
            || call_name.starts_with(IIFE_DIRECT_PREFIX))
        {
            return None;
        }
        let iife_qn = format!("{module_qn}.{call_name}");
        self.lookup(&iife_qn)
    }

    /// Strategy 2: `super` / `super.x` through the caller's ancestry.
    fn resolve_super_call(
        &self,
        call_name: &str,
        class_context: Option<&str>,
    ) -> Option<(SymbolKind, String)> {
        let method_name = if call_name == "super" || call_name == "super()" {
            "constructor"
        } else {
            call_name.split_once('.').map(|(_, rest)| rest)?
        };

        let class_qn = class_context?;
        let resolved = self.state.find_inherited_method(class_qn, method_name)?;
        tracing::debug!("Resolved super call {call_name} -> {resolved}");
        self.lookup(&resolved)
    }

    /// Strategy 3: `a().b().c()` — infer the receiver chain's type and
    /// dispatch the final method on it.
    fn resolve_chained_call(
        &self,
        call_name: &str,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
    ) -> Option<(SymbolKind, String)> {
        let (object_expr, final_method) = split_final_segment(call_name)?;
        let final_method = final_method.trim_end_matches("()");

        let object_type =
            infer_expression_type(object_expr, module_qn, local_var_types, self.state)?;
        let full_object_type = if object_type.contains('.') {
            object_type
        } else {
            self.resolve_class_qn(&object_type, module_qn)?
        };

        let method_qn = format!("{full_object_type}.{final_method}");
        if let Some(result) = self.lookup(&method_qn) {
            tracing::debug!("Resolved chained call {call_name} -> {method_qn}");
            return Some(result);
        }
        let inherited = self
            .state
            .find_inherited_method(&full_object_type, final_method)?;
        tracing::debug!("Resolved chained call {call_name} -> {inherited} (inherited)");
        self.lookup(&inherited)
    }

    /// Strategies 4-7: everything driven by the module's import map.
    fn try_via_imports(
        &self,
        call_name: &str,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
    ) -> Option<(SymbolKind, String)> {
        let import_map = self.state.module_imports(module_qn)?;

        // Strategy 4: direct import.
        if let Some(imported_qn) = import_map.get(call_name) {
            if let Some(result) = self.lookup(imported_qn) {
                tracing::debug!("Resolved {call_name} via direct import -> {imported_qn}");
                return Some(result);
            }
        }

        if has_separator(call_name) {
            let normalized = normalize_call_name(call_name);
            let parts: Vec<&str> = normalized.split('.').collect();

            if parts.len() == 2 {
                if let Some(result) = self.resolve_two_part_call(
                    &parts, call_name, import_map, module_qn, local_var_types,
                ) {
                    return Some(result);
                }
            }

            // Strategy 6: `self.attr.method()` via the instance map.
            if parts.len() >= 3 && parts[0] == "self" {
                if let Some(result) = self.resolve_self_attribute_call(
                    &parts, import_map, module_qn, local_var_types,
                ) {
                    return Some(result);
                }
            }

            if parts.len() >= 3 {
                if let Some(result) =
                    self.resolve_multi_part_call(&parts, import_map, module_qn, local_var_types)
                {
                    return Some(result);
                }
            }
        }

        self.try_wildcard_imports(call_name, import_map)
    }

    /// Strategy 5: `obj.method()`.
    fn resolve_two_part_call(
        &self,
        parts: &[&str],
        call_name: &str,
        import_map: &ModuleImports,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
    ) -> Option<(SymbolKind, String)> {
        let (object_name, method_name) = (parts[0], parts[1]);

        // 5a: the object has a known local type.
        if let Some(var_type) = local_var_types.and_then(|types| types.get(object_name)) {
            if let Some(class_qn) = self.resolve_class_qn(var_type, module_qn) {
                let method_qn = format!("{class_qn}.{method_name}");
                if let Some(result) = self.lookup(&method_qn) {
                    tracing::debug!("Resolved {call_name} via local type -> {method_qn}");
                    return Some(result);
                }
                if let Some(inherited) = self.state.find_inherited_method(&class_qn, method_name)
                {
                    tracing::debug!("Resolved {call_name} via inherited method -> {inherited}");
                    return self.lookup(&inherited);
                }
            }
            if JS_BUILTIN_TYPES.contains(&var_type.as_str()) {
                return Some((
                    SymbolKind::Function,
                    builtin_prototype_method(var_type, method_name),
                ));
            }
        }

        // 5b: the object is an imported module or class.
        if let Some(imported) = import_map.get(object_name) {
            let class_qn = self.resolve_imported_class_qn(imported, object_name, method_name);
            let method_qn = format!("{class_qn}.{method_name}");
            if let Some(result) = self.lookup(&method_qn) {
                tracing::debug!("Resolved {call_name} via import -> {method_qn}");
                return Some(result);
            }
        }

        // 5c: module-level function used as an attribute of the module.
        let module_method_qn = format!("{module_qn}.{method_name}");
        if let Some(result) = self.lookup(&module_method_qn) {
            tracing::debug!("Resolved {call_name} as module method -> {module_method_qn}");
            return Some(result);
        }
        None
    }

    /// Strategy 6: `self.attr.method()` resolved through the instance
    /// attribute map built by type inference.
    fn resolve_self_attribute_call(
        &self,
        parts: &[&str],
        import_map: &ModuleImports,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
    ) -> Option<(SymbolKind, String)> {
        let attribute_ref = parts[..parts.len() - 1].join(".");
        let method_name = parts[parts.len() - 1];

        let var_type = local_var_types?.get(&attribute_ref)?;
        let class_qn = self.resolve_class_qn_with_map(var_type, import_map, module_qn)?;
        let method_qn = format!("{class_qn}.{method_name}");
        if let Some(result) = self.lookup(&method_qn) {
            return Some(result);
        }
        let inherited = self.state.find_inherited_method(&class_qn, method_name)?;
        self.lookup(&inherited)
    }

    /// Strategy 7: `A.B.C()` — resolve the head, concatenate the rest.
    fn resolve_multi_part_call(
        &self,
        parts: &[&str],
        import_map: &ModuleImports,
        module_qn: &str,
        local_var_types: Option<&LocalTypes>,
    ) -> Option<(SymbolKind, String)> {
        let head = parts[0];
        let rest = parts[1..].join(".");

        if let Some(head_qn) = import_map.get(head) {
            let method_qn = format!("{head_qn}.{rest}");
            if let Some(result) = self.lookup(&method_qn) {
                return Some(result);
            }
        }

        if let Some(var_type) = local_var_types.and_then(|types| types.get(head)) {
            if let Some(class_qn) = self.resolve_class_qn(var_type, module_qn) {
                let method_qn = format!("{class_qn}.{rest}");
                if let Some(result) = self.lookup(&method_qn) {
                    return Some(result);
                }
                let method_name = parts[parts.len() - 1];
                if let Some(inherited) =
                    self.state.find_inherited_method(&class_qn, method_name)
                {
                    return self.lookup(&inherited);
                }
            }
        }
        None
    }

    /// Wildcard imports: `from m import *` exposes `m.<call>`.
    fn try_wildcard_imports(
        &self,
        call_name: &str,
        import_map: &ModuleImports,
    ) -> Option<(SymbolKind, String)> {
        for (local_name, imported_qn) in import_map {
            if !local_name.starts_with('*') {
                continue;
            }
            let candidate = format!("{imported_qn}.{call_name}");
            if let Some(result) = self.lookup(&candidate) {
                tracing::debug!("Resolved {call_name} via wildcard import -> {candidate}");
                return Some(result);
            }
        }
        None
    }

    /// Strategy 8: a function defined in the same module.
    fn try_same_module(&self, call_name: &str, module_qn: &str) -> Option<(SymbolKind, String)> {
        let normalized = normalize_call_name(call_name);
        let candidate = format!("{module_qn}.{normalized}");
        let result = self.lookup(&candidate);
        if result.is_some() {
            tracing::debug!("Resolved {call_name} in same module -> {candidate}");
        }
        result
    }

    /// Strategy 9: suffix search over the whole registry, ranked by
    /// import distance to the caller.
    fn try_via_trie(&self, call_name: &str, module_qn: &str) -> Option<(SymbolKind, String)> {
        let search_name = normalize_call_name(call_name);
        let search_name = search_name.rsplit('.').next()?;
        let mut matches = self.state.registry.find_ending_with(search_name);
        if matches.is_empty() {
            tracing::debug!("Unresolved call: {call_name}");
            return None;
        }

        matches.sort_by_key(|qn| import_distance(qn, module_qn));
        let best = matches.into_iter().next()?;
        tracing::debug!("Resolved {call_name} via trie fallback -> {best}");
        self.lookup(&best)
    }

    /// Strategy 10 (operators): C++ operator overloads, preferring the
    /// caller's own module.
    pub fn resolve_cpp_operator_call(
        &self,
        call_name: &str,
        module_qn: &str,
    ) -> Option<(SymbolKind, String)> {
        if !call_name.starts_with("operator_") {
            return None;
        }
        let matches = self.state.registry.find_ending_with(call_name);
        if matches.is_empty() {
            return None;
        }
        let mut candidates: Vec<String> = matches
            .iter()
            .filter(|qn| qn.starts_with(module_qn))
            .cloned()
            .collect();
        if candidates.is_empty() {
            candidates = matches;
        }
        candidates.sort_by_key(|qn| (qn.len(), qn.clone()));
        let best = candidates.into_iter().next()?;
        self.lookup(&best)
    }

    fn lookup(&self, fqn: &str) -> Option<(SymbolKind, String)> {
        self.state.registry.get(fqn).map(|kind| (kind, fqn.to_string()))
    }

    fn resolve_class_qn(&self, var_type: &str, module_qn: &str) -> Option<String> {
        if var_type.contains('.') {
            return Some(var_type.to_string());
        }
        let import_map = self.state.module_imports(module_qn);
        if let Some(full) = import_map.and_then(|map| map.get(var_type)) {
            return Some(full.clone());
        }
        crate::definitions::classes::resolve_class_name(self.state, var_type, module_qn)
    }

    fn resolve_class_qn_with_map(
        &self,
        var_type: &str,
        import_map: &ModuleImports,
        module_qn: &str,
    ) -> Option<String> {
        if var_type.contains('.') {
            return Some(var_type.to_string());
        }
        if let Some(full) = import_map.get(var_type) {
            return Some(full.clone());
        }
        crate::definitions::classes::resolve_class_name(self.state, var_type, module_qn)
    }

    /// An import-map value may point at a module rather than a class;
    /// when `<value>.<object>` holds the method, prefer that nesting.
    fn resolve_imported_class_qn(
        &self,
        imported: &str,
        object_name: &str,
        method_name: &str,
    ) -> String {
        let imported = imported.replace("::", ".");
        let nested = format!("{imported}.{object_name}");
        let nested_method = format!("{nested}.{method_name}");
        if self.state.registry.contains(&nested_method) {
            nested
        } else {
            imported
        }
    }
}

/// Dotted FQN dissimilarity: shared prefix shortens distance, siblings
/// of the caller's parent get a bonus.
pub fn import_distance(candidate_qn: &str, caller_module_qn: &str) -> i64 {
    let caller: Vec<&str> = caller_module_qn.split('.').collect();
    let candidate: Vec<&str> = candidate_qn.split('.').collect();

    let common = caller
        .iter()
        .zip(candidate.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut distance = caller.len().max(candidate.len()) as i64 - common as i64;

    if caller.len() > 1 {
        let sibling_prefix = format!("{}.", caller[..caller.len() - 1].join("."));
        if candidate_qn.starts_with(&sibling_prefix) {
            distance -= 1;
        }
    }
    distance
}

fn is_super_call(call_name: &str) -> bool {
    call_name == "super"
        || call_name == "super()"
        || call_name.starts_with("super.")
        || call_name.starts_with("super().")
}

fn is_method_chain(call_name: &str) -> bool {
    if !call_name.contains('(') || !call_name.contains(')') {
        return false;
    }
    let parts: Vec<&str> = call_name.split('.').collect();
    parts.len() >= 2 && parts.iter().any(|p| p.contains('(') && p.contains(')'))
}

fn has_separator(call_name: &str) -> bool {
    call_name.contains('.') || call_name.contains("::") || call_name.contains(':')
}

/// Normalize language separators to the registry's dotted form.
fn normalize_call_name(call_name: &str) -> String {
    call_name.replace("::", ".").replace(':', ".")
}

/// Split `a().b().c` into the object expression and the final segment.
fn split_final_segment(call_name: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    let mut last_dot = None;
    for (i, ch) in call_name.char_indices() {
        match ch {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => last_dot = Some(i),
            _ => {}
        }
    }
    let idx = last_dot?;
    let object_expr = &call_name[..idx];
    let final_segment = &call_name[idx + 1..];
    (!object_expr.is_empty() && !final_segment.is_empty())
        .then_some((object_expr, final_segment))
}
