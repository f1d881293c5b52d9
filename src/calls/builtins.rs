//! Built-in and operator tables used as the last resolution rung.

use crate::symbol::SymbolKind;

pub const BUILTIN_PREFIX: &str = "builtins";

/// JS globals that are worth an edge even though they are external.
const JS_BUILTIN_PATTERNS: &[&str] = &[
    "console.log",
    "console.error",
    "console.warn",
    "console.info",
    "console.debug",
    "JSON.parse",
    "JSON.stringify",
    "Object.keys",
    "Object.values",
    "Object.entries",
    "Object.assign",
    "Object.freeze",
    "Array.isArray",
    "Array.from",
    "Math.max",
    "Math.min",
    "Math.floor",
    "Math.ceil",
    "Math.round",
    "Math.abs",
    "Math.random",
    "Number.isInteger",
    "Promise.all",
    "Promise.race",
    "Promise.resolve",
    "Promise.reject",
    "parseInt",
    "parseFloat",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
];

/// Suffixes that resolve to `Function.prototype` methods.
const JS_PROTOTYPE_SUFFIXES: &[(&str, &str)] = &[(".bind", "bind"), (".call", "call"), (".apply", "apply")];

/// JS built-in types whose instances resolve methods onto prototypes.
pub const JS_BUILTIN_TYPES: &[&str] = &[
    "Array", "String", "Object", "Number", "Boolean", "Map", "Set", "Promise", "Date", "RegExp",
];

/// Resolve a call against the JS built-in tables.
pub fn resolve_builtin_call(call_name: &str) -> Option<(SymbolKind, String)> {
    if JS_BUILTIN_PATTERNS.contains(&call_name) {
        return Some((SymbolKind::Function, format!("{BUILTIN_PREFIX}.{call_name}")));
    }

    for (suffix, method) in JS_PROTOTYPE_SUFFIXES {
        if call_name.ends_with(suffix) && call_name.len() > suffix.len() {
            // `f.call(...)` / `f.apply(...)` dispatch through the base
            // callable; `.prototype.x.call` keeps the base expression.
            if call_name.contains(".prototype.") {
                let base = call_name.rsplit_once('.').map(|(head, _)| head)?;
                return Some((SymbolKind::Function, base.to_string()));
            }
            return Some((
                SymbolKind::Function,
                format!("{BUILTIN_PREFIX}.Function.prototype.{method}"),
            ));
        }
    }

    None
}

/// Prototype method FQN for a built-in receiver type.
pub fn builtin_prototype_method(var_type: &str, method_name: &str) -> String {
    format!("{BUILTIN_PREFIX}.{var_type}.prototype.{method_name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_log_is_a_builtin() {
        let (kind, qn) = resolve_builtin_call("console.log").unwrap();
        assert_eq!(kind, SymbolKind::Function);
        assert_eq!(qn, "builtins.console.log");
    }

    #[test]
    fn call_and_apply_map_to_function_prototype() {
        let (_, qn) = resolve_builtin_call("handler.call").unwrap();
        assert_eq!(qn, "builtins.Function.prototype.call");
    }

    #[test]
    fn prototype_call_keeps_the_base() {
        let (_, qn) = resolve_builtin_call("Animal.prototype.speak.call").unwrap();
        assert_eq!(qn, "Animal.prototype.speak");
    }

    #[test]
    fn unknown_names_miss() {
        assert!(resolve_builtin_call("business_logic").is_none());
    }
}
