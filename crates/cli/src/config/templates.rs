use super::workspace::Toolchain;

fn json_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("\"{item}\"")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Starter config for a project built with `toolchain`
pub fn create_default_config(toolchain: Toolchain) -> String {
    // Use raw JSON text to preserve field order
    let command = match toolchain.watch_command() {
        Some((program, args)) => format!(
            r#",
            "command": {{ "program": "{program}", "args": {} }}"#,
            json_list(args)
        ),
        None => String::new(),
    };

    format!(
        r#"{{
  "debounce_ms": 100,
  "targets": [
    {{
      "out": "src/generated.ts",
      "contracts": [],
      "plugins": [
        {{
          "name": "artifacts",
          "options": {{
            "directory": "{directory}",
            "include": ["*.json"],
            "exclude": {exclude}{command}
          }}
        }}
      ]
    }}
  ]
}}
"#,
        directory = toolchain.artifacts_dir(),
        exclude = json_list(toolchain.excludes()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contractgen_core::Config;

    #[test]
    fn test_templates_parse_as_config() {
        for toolchain in [Toolchain::Foundry, Toolchain::Hardhat, Toolchain::Unknown] {
            let text = create_default_config(toolchain);
            let config: Config = serde_json::from_str(&text)
                .unwrap_or_else(|e| panic!("{toolchain:?} template is invalid: {e}\n{text}"));
            config.validate().unwrap();

            let plugin = &config.targets[0].plugins[0];
            assert_eq!(plugin.name, "artifacts");
            assert_eq!(plugin.options["directory"], toolchain.artifacts_dir());
            assert_eq!(
                plugin.options.get("command").is_some(),
                toolchain.watch_command().is_some()
            );
        }
    }
}
