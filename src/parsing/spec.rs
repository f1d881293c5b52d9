//! Per-language parsing tables.
//!
//! All language variability the walkers need lives in this data: which
//! AST node-type names the grammar uses for functions, classes, modules,
//! calls, and imports, which child fields carry names and bodies, and
//! which filenames mark a directory as a package. A sub-ingestion whose
//! node-type list is empty for a language is skipped (and logged at
//! debug) rather than failing.

use super::Language;

/// Immutable per-language parsing characteristics.
#[derive(Debug, Clone, Copy)]
pub struct LanguageSpec {
    pub language: Language,
    pub file_extensions: &'static [&'static str],
    pub function_node_types: &'static [&'static str],
    pub class_node_types: &'static [&'static str],
    pub module_node_types: &'static [&'static str],
    pub call_node_types: &'static [&'static str],
    pub import_node_types: &'static [&'static str],
    pub name_field: &'static str,
    pub body_field: &'static str,
    pub package_indicators: &'static [&'static str],
}

impl LanguageSpec {
    pub fn is_function_node(&self, kind: &str) -> bool {
        self.function_node_types.contains(&kind)
    }

    pub fn is_class_node(&self, kind: &str) -> bool {
        self.class_node_types.contains(&kind)
    }

    pub fn is_module_node(&self, kind: &str) -> bool {
        self.module_node_types.contains(&kind)
    }
}

static PYTHON: LanguageSpec = LanguageSpec {
    language: Language::Python,
    file_extensions: &["py", "pyi"],
    function_node_types: &["function_definition"],
    class_node_types: &["class_definition"],
    module_node_types: &["module"],
    call_node_types: &["call"],
    import_node_types: &["import_statement", "import_from_statement"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["__init__.py"],
};

static JAVASCRIPT: LanguageSpec = LanguageSpec {
    language: Language::JavaScript,
    file_extensions: &["js", "jsx", "mjs", "cjs"],
    function_node_types: &[
        "function_declaration",
        "function_expression",
        "arrow_function",
        "method_definition",
        "generator_function_declaration",
        "generator_function",
    ],
    class_node_types: &["class_declaration", "class"],
    module_node_types: &["program"],
    call_node_types: &["call_expression", "new_expression"],
    import_node_types: &["import_statement"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["package.json"],
};

static TYPESCRIPT: LanguageSpec = LanguageSpec {
    language: Language::TypeScript,
    file_extensions: &["ts", "tsx", "mts", "cts"],
    function_node_types: &[
        "function_declaration",
        "function_expression",
        "arrow_function",
        "method_definition",
        "generator_function_declaration",
        "generator_function",
    ],
    class_node_types: &[
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
        "enum_declaration",
        "type_alias_declaration",
    ],
    module_node_types: &["program"],
    call_node_types: &["call_expression", "new_expression"],
    import_node_types: &["import_statement"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["package.json", "tsconfig.json"],
};

static JAVA: LanguageSpec = LanguageSpec {
    language: Language::Java,
    file_extensions: &["java"],
    function_node_types: &["method_declaration", "constructor_declaration"],
    class_node_types: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    module_node_types: &["program"],
    call_node_types: &["method_invocation", "object_creation_expression"],
    import_node_types: &["import_declaration"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["pom.xml", "build.gradle", "build.gradle.kts"],
};

static GO: LanguageSpec = LanguageSpec {
    language: Language::Go,
    file_extensions: &["go"],
    function_node_types: &["function_declaration", "method_declaration", "func_literal"],
    class_node_types: &["type_spec"],
    module_node_types: &["source_file"],
    call_node_types: &["call_expression"],
    import_node_types: &["import_declaration"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["go.mod"],
};

static RUST: LanguageSpec = LanguageSpec {
    language: Language::Rust,
    file_extensions: &["rs"],
    function_node_types: &["function_item"],
    class_node_types: &[
        "struct_item",
        "enum_item",
        "trait_item",
        "union_item",
        "type_item",
        "impl_item",
    ],
    module_node_types: &["source_file"],
    call_node_types: &["call_expression"],
    import_node_types: &["use_declaration"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["Cargo.toml"],
};

static C: LanguageSpec = LanguageSpec {
    language: Language::C,
    file_extensions: &["c", "h"],
    function_node_types: &["function_definition"],
    class_node_types: &["struct_specifier", "enum_specifier", "union_specifier"],
    module_node_types: &["translation_unit"],
    call_node_types: &["call_expression"],
    import_node_types: &["preproc_include"],
    name_field: "name",
    body_field: "body",
    package_indicators: &[],
};

static CPP: LanguageSpec = LanguageSpec {
    language: Language::Cpp,
    file_extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx", "ixx", "cppm"],
    function_node_types: &["function_definition", "lambda_expression"],
    class_node_types: &[
        "class_specifier",
        "struct_specifier",
        "enum_specifier",
        "union_specifier",
    ],
    module_node_types: &["translation_unit"],
    call_node_types: &["call_expression", "binary_expression"],
    import_node_types: &["preproc_include"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["CMakeLists.txt"],
};

static CSHARP: LanguageSpec = LanguageSpec {
    language: Language::CSharp,
    file_extensions: &["cs"],
    function_node_types: &[
        "method_declaration",
        "constructor_declaration",
        "local_function_statement",
    ],
    class_node_types: &[
        "class_declaration",
        "interface_declaration",
        "struct_declaration",
        "enum_declaration",
        "record_declaration",
    ],
    module_node_types: &["compilation_unit"],
    call_node_types: &["invocation_expression", "object_creation_expression"],
    import_node_types: &["using_directive"],
    name_field: "name",
    body_field: "body",
    package_indicators: &[],
};

static PHP: LanguageSpec = LanguageSpec {
    language: Language::Php,
    file_extensions: &["php", "phtml"],
    function_node_types: &["function_definition", "method_declaration"],
    class_node_types: &[
        "class_declaration",
        "interface_declaration",
        "enum_declaration",
        "trait_declaration",
    ],
    module_node_types: &["program"],
    call_node_types: &[
        "function_call_expression",
        "member_call_expression",
        "scoped_call_expression",
        "object_creation_expression",
    ],
    import_node_types: &["namespace_use_declaration"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["composer.json"],
};

static RUBY: LanguageSpec = LanguageSpec {
    language: Language::Ruby,
    file_extensions: &["rb", "rake"],
    function_node_types: &["method", "singleton_method"],
    class_node_types: &["class", "module"],
    module_node_types: &["program"],
    call_node_types: &["call"],
    import_node_types: &["call"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["Gemfile"],
};

static LUA: LanguageSpec = LanguageSpec {
    language: Language::Lua,
    file_extensions: &["lua"],
    function_node_types: &["function_declaration", "function_definition"],
    class_node_types: &[],
    module_node_types: &["chunk"],
    call_node_types: &["function_call"],
    import_node_types: &["function_call"],
    name_field: "name",
    body_field: "body",
    package_indicators: &[],
};

static SCALA: LanguageSpec = LanguageSpec {
    language: Language::Scala,
    file_extensions: &["scala", "sc"],
    function_node_types: &["function_definition"],
    class_node_types: &[
        "class_definition",
        "object_definition",
        "trait_definition",
        "enum_definition",
    ],
    module_node_types: &["compilation_unit"],
    call_node_types: &["call_expression"],
    import_node_types: &["import_declaration"],
    name_field: "name",
    body_field: "body",
    package_indicators: &["build.sbt"],
};

/// Look up the spec for a language.
pub fn language_spec(language: Language) -> &'static LanguageSpec {
    match language {
        Language::Python => &PYTHON,
        Language::JavaScript => &JAVASCRIPT,
        Language::TypeScript => &TYPESCRIPT,
        Language::Java => &JAVA,
        Language::Go => &GO,
        Language::Rust => &RUST,
        Language::C => &C,
        Language::Cpp => &CPP,
        Language::CSharp => &CSHARP,
        Language::Php => &PHP,
        Language::Ruby => &RUBY,
        Language::Lua => &LUA,
        Language::Scala => &SCALA,
    }
}

/// Union of package-indicator filenames across all languages.
pub fn all_package_indicators() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Language::ALL
        .iter()
        .flat_map(|l| language_spec(*l).package_indicators.iter().copied())
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_language_matches_lookup_key() {
        for language in Language::ALL {
            assert_eq!(language_spec(language).language, language);
        }
    }

    #[test]
    fn extensions_round_trip_through_detection() {
        for language in Language::ALL {
            for ext in language_spec(language).file_extensions {
                let detected = Language::from_extension(ext);
                // `h` is claimed by C, and several languages share nothing else.
                if *ext != "h" {
                    assert_eq!(detected, Some(language), "extension {ext}");
                }
            }
        }
    }

    #[test]
    fn package_indicators_include_the_big_ecosystems() {
        let all = all_package_indicators();
        assert!(all.contains(&"__init__.py"));
        assert!(all.contains(&"package.json"));
        assert!(all.contains(&"Cargo.toml"));
        assert!(all.contains(&"go.mod"));
    }
}
