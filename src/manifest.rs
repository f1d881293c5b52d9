//! Dependency-manifest parsing for ExternalPackage nodes, plus the
//! light framework detector.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// A declared external dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub spec: String,
    /// Extra relationship properties, e.g. the optional-group name.
    pub group: Option<String>,
}

impl Dependency {
    fn new(name: impl Into<String>, spec: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            spec: spec.into(),
            group: None,
        }
    }

    fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }
}

/// Parse any recognized dependency manifest. Unknown or unreadable
/// files produce an empty list.
pub fn parse_dependencies(file_path: &Path) -> Vec<Dependency> {
    let Some(file_name) = file_path.file_name().and_then(|n| n.to_str()) else {
        return Vec::new();
    };
    let Ok(content) = std::fs::read_to_string(file_path) else {
        return Vec::new();
    };

    match file_name {
        "pyproject.toml" => parse_pyproject(&content),
        "requirements.txt" => parse_requirements(&content),
        "package.json" => parse_package_json(&content),
        "Cargo.toml" => parse_cargo_toml(&content),
        "go.mod" => parse_go_mod(&content),
        "Gemfile" => parse_gemfile(&content),
        "composer.json" => parse_composer_json(&content),
        name if name.ends_with(".csproj") => parse_csproj(&content),
        _ => Vec::new(),
    }
}

/// Package name and version spec from a PEP 508 line.
fn pep508_name(line: &str) -> Option<(String, String)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^([A-Za-z0-9_.-]+)(?:\[[^\]]*\])?").unwrap());
    let stripped = line.trim();
    let capture = re.captures(stripped)?;
    let name = capture[1].to_string();
    let spec = stripped[capture[0].len()..].trim().to_string();
    (!name.is_empty()).then_some((name, spec))
}

fn parse_pyproject(content: &str) -> Vec<Dependency> {
    let Ok(value) = content.parse::<toml::Value>() else {
        tracing::warn!("Failed to parse pyproject.toml");
        return Vec::new();
    };
    let mut deps = Vec::new();

    if let Some(list) = value
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_array())
    {
        for entry in list.iter().filter_map(|v| v.as_str()) {
            if let Some((name, spec)) = pep508_name(entry) {
                deps.push(Dependency::new(name, spec));
            }
        }
    }
    if let Some(groups) = value
        .get("project")
        .and_then(|p| p.get("optional-dependencies"))
        .and_then(|d| d.as_table())
    {
        for (group, list) in groups {
            for entry in list.as_array().into_iter().flatten().filter_map(|v| v.as_str()) {
                if let Some((name, spec)) = pep508_name(entry) {
                    deps.push(Dependency::new(name, spec).with_group(group.clone()));
                }
            }
        }
    }
    if let Some(table) = value
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(|d| d.as_table())
    {
        for (name, spec) in table {
            if name.eq_ignore_ascii_case("python") {
                continue;
            }
            let spec_str = match spec {
                toml::Value::String(s) => s.clone(),
                other => other
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            };
            deps.push(Dependency::new(name.clone(), spec_str));
        }
    }
    deps
}

fn parse_requirements(content: &str) -> Vec<Dependency> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
        .filter_map(pep508_name)
        .map(|(name, spec)| Dependency::new(name, spec))
        .collect()
}

fn parse_package_json(content: &str) -> Vec<Dependency> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        tracing::warn!("Failed to parse package.json");
        return Vec::new();
    };
    let mut deps = Vec::new();
    for (section, group) in [
        ("dependencies", None),
        ("devDependencies", Some("dev")),
        ("peerDependencies", Some("peer")),
    ] {
        if let Some(table) = value.get(section).and_then(|d| d.as_object()) {
            for (name, spec) in table {
                let mut dep = Dependency::new(name.clone(), spec.as_str().unwrap_or_default());
                if let Some(group) = group {
                    dep = dep.with_group(group);
                }
                deps.push(dep);
            }
        }
    }
    deps
}

fn parse_cargo_toml(content: &str) -> Vec<Dependency> {
    let Ok(value) = content.parse::<toml::Value>() else {
        tracing::warn!("Failed to parse Cargo.toml");
        return Vec::new();
    };
    let mut deps = Vec::new();
    for (section, group) in [
        ("dependencies", None),
        ("dev-dependencies", Some("dev")),
        ("build-dependencies", Some("build")),
    ] {
        let Some(table) = value.get(section).and_then(|d| d.as_table()) else {
            continue;
        };
        for (name, spec) in table {
            let spec_str = match spec {
                toml::Value::String(s) => s.clone(),
                other => other
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            };
            let mut dep = Dependency::new(name.clone(), spec_str);
            if let Some(group) = group {
                dep = dep.with_group(group);
            }
            deps.push(dep);
        }
    }
    deps
}

fn parse_go_mod(content: &str) -> Vec<Dependency> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^\s*([\w./-]+)\s+(v[\w.+-]+)").unwrap());

    let mut deps = Vec::new();
    let mut in_require_block = false;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("require (") {
            in_require_block = true;
            continue;
        }
        if in_require_block && trimmed == ")" {
            in_require_block = false;
            continue;
        }
        let candidate = trimmed.strip_prefix("require ").unwrap_or(trimmed);
        if (in_require_block || trimmed.starts_with("require ")) && !candidate.is_empty() {
            if let Some(capture) = re.captures(candidate) {
                deps.push(Dependency::new(&capture[1], &capture[2]));
            }
        }
    }
    deps
}

fn parse_gemfile(content: &str) -> Vec<Dependency> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"^\s*gem\s+['"]([^'"]+)['"](?:\s*,\s*['"]([^'"]+)['"])?"#).unwrap()
    });
    content
        .lines()
        .filter_map(|line| re.captures(line))
        .map(|capture| {
            Dependency::new(
                &capture[1],
                capture.get(2).map(|m| m.as_str()).unwrap_or_default(),
            )
        })
        .collect()
}

fn parse_composer_json(content: &str) -> Vec<Dependency> {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(content) else {
        return Vec::new();
    };
    let mut deps = Vec::new();
    for (section, group) in [("require", None), ("require-dev", Some("dev"))] {
        if let Some(table) = value.get(section).and_then(|d| d.as_object()) {
            for (name, spec) in table {
                if name == "php" || name.starts_with("ext-") {
                    continue;
                }
                let mut dep = Dependency::new(name.clone(), spec.as_str().unwrap_or_default());
                if let Some(group) = group {
                    dep = dep.with_group(group);
                }
                deps.push(dep);
            }
        }
    }
    deps
}

fn parse_csproj(content: &str) -> Vec<Dependency> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"PackageReference\s+Include="([^"]+)"(?:\s+Version="([^"]+)")?"#).unwrap()
    });
    re.captures_iter(content)
        .map(|capture| {
            Dependency::new(
                &capture[1],
                capture.get(2).map(|m| m.as_str()).unwrap_or_default(),
            )
        })
        .collect()
}

/// Light framework detection over the repository's manifests.
///
/// Returns a framework name when one of the well-known markers shows up
/// in a root manifest.
pub fn detect_framework(repo_path: &Path) -> Option<&'static str> {
    const JS_FRAMEWORKS: &[(&str, &str)] = &[
        ("react", "react"),
        ("vue", "vue"),
        ("@angular/core", "angular"),
        ("next", "nextjs"),
        ("express", "express"),
        ("svelte", "svelte"),
    ];
    const PY_FRAMEWORKS: &[(&str, &str)] = &[
        ("django", "django"),
        ("flask", "flask"),
        ("fastapi", "fastapi"),
    ];
    const RUST_FRAMEWORKS: &[(&str, &str)] =
        &[("axum", "axum"), ("actix-web", "actix"), ("rocket", "rocket")];

    let package_json = repo_path.join("package.json");
    if package_json.is_file() {
        for dep in parse_dependencies(&package_json) {
            if let Some((_, framework)) = JS_FRAMEWORKS.iter().find(|(name, _)| *name == dep.name)
            {
                return Some(framework);
            }
        }
    }
    for manifest in ["pyproject.toml", "requirements.txt"] {
        let path = repo_path.join(manifest);
        if path.is_file() {
            for dep in parse_dependencies(&path) {
                let lowered = dep.name.to_lowercase();
                if let Some((_, framework)) =
                    PY_FRAMEWORKS.iter().find(|(name, _)| *name == lowered)
                {
                    return Some(framework);
                }
            }
        }
    }
    let cargo_toml = repo_path.join("Cargo.toml");
    if cargo_toml.is_file() {
        for dep in parse_dependencies(&cargo_toml) {
            if let Some((_, framework)) =
                RUST_FRAMEWORKS.iter().find(|(name, _)| *name == dep.name)
            {
                return Some(framework);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pep508_names() {
        assert_eq!(
            pep508_name("requests[security]>=2.0"),
            Some(("requests".to_string(), ">=2.0".to_string()))
        );
        assert_eq!(
            pep508_name("numpy"),
            Some(("numpy".to_string(), String::new()))
        );
    }

    #[test]
    fn requirements_txt() {
        let deps = parse_requirements("# comment\nrequests>=2.0\n-r other.txt\nflask\n");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(deps[1].name, "flask");
    }

    #[test]
    fn package_json_sections() {
        let deps = parse_package_json(
            r#"{"dependencies": {"express": "^4.0"}, "devDependencies": {"jest": "^29.0"}}"#,
        );
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "express");
        assert_eq!(deps[1].group.as_deref(), Some("dev"));
    }

    #[test]
    fn cargo_toml_tables() {
        let deps = parse_cargo_toml(
            "[dependencies]\nserde = { version = \"1.0\", features = [\"derive\"] }\ntracing = \"0.1\"\n",
        );
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().any(|d| d.name == "serde" && d.spec == "1.0"));
    }

    #[test]
    fn go_mod_require_block() {
        let deps = parse_go_mod(
            "module example.com/app\n\nrequire (\n\tgithub.com/rs/zerolog v1.31.0\n)\nrequire golang.org/x/sync v0.5.0\n",
        );
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "github.com/rs/zerolog");
    }

    #[test]
    fn csproj_package_references() {
        let deps = parse_csproj(
            r#"<ItemGroup><PackageReference Include="Newtonsoft.Json" Version="13.0.1" /></ItemGroup>"#,
        );
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "Newtonsoft.Json");
        assert_eq!(deps[0].spec, "13.0.1");
    }
}
