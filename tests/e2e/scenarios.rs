use super::harness::{
    APP_LOCK, TestContext, locked_package, parse_json, parse_toml, read_file, write_file,
};

pub struct Scenario {
    pub name: &'static str,
    pub run: fn(&TestContext) -> Result<(), String>,
}

const SECTION: &str = "[tool.poetry-monorepo.deps]";

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "help_output",
            run: scenario_help,
        },
        Scenario {
            name: "no_args_error",
            run: scenario_no_args,
        },
        Scenario {
            name: "no_pyproject_error",
            run: scenario_no_pyproject,
        },
        Scenario {
            name: "not_configured",
            run: scenario_not_configured,
        },
        Scenario {
            name: "disabled_section",
            run: scenario_disabled,
        },
        Scenario {
            name: "build_rewrites_groups",
            run: scenario_build_rewrites_groups,
        },
        Scenario {
            name: "build_json",
            run: scenario_build_json,
        },
        Scenario {
            name: "unselected_command_leaves_lock",
            run: scenario_unselected_command,
        },
        Scenario {
            name: "verbose_debug_lines",
            run: scenario_verbose,
        },
        Scenario {
            name: "export_to_file",
            run: scenario_export_to_file,
        },
        Scenario {
            name: "export_to_stdout",
            run: scenario_export_to_stdout,
        },
        Scenario {
            name: "export_in_place",
            run: scenario_export_in_place,
        },
        Scenario {
            name: "export_dry_run",
            run: scenario_export_dry_run,
        },
        Scenario {
            name: "only_develop",
            run: scenario_only_develop,
        },
        Scenario {
            name: "caret_constraint",
            run: scenario_caret_constraint,
        },
        Scenario {
            name: "missing_lock_file",
            run: scenario_missing_lock,
        },
        Scenario {
            name: "invalid_config",
            run: scenario_invalid_config,
        },
        Scenario {
            name: "config_json",
            run: scenario_config_json,
        },
        Scenario {
            name: "config_inactive",
            run: scenario_config_inactive,
        },
        Scenario {
            name: "project_flag",
            run: scenario_project_flag,
        },
    ]
}

fn scenario_help(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("help", "")?;
    let output = ctx.run_bin(&["--help"], &env.root)?;
    output.assert_success()?;
    output.assert_stdout_contains("run")?;
    output.assert_stdout_contains("config")?;
    Ok(())
}

fn scenario_no_args(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("no-args", "")?;
    let output = ctx.run_bin(&[], &env.app)?;
    output.assert_failure()?;
    output.assert_stderr_contains("No command specified")?;
    Ok(())
}

fn scenario_no_pyproject(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("no-pyproject", "")?;
    let empty = env.root.join("empty");
    write_file(&empty.join("README"), "")?;
    let output = ctx.run_bin(&["run", "build"], &empty)?;
    output.assert_failure()?;
    output.assert_stderr_contains("Error:")?;
    output.assert_stderr_contains("pyproject.toml")?;
    Ok(())
}

fn scenario_not_configured(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("not-configured", "")?;
    let output = ctx.run_bin(&["run", "export", "--in-place"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Nothing to do")?;
    output.assert_stdout_not_contains("# Replacing")?;

    let lock = read_file(&env.app.join("poetry.lock"))?;
    if lock != APP_LOCK {
        return Err("poetry.lock changed although the plugin is not configured".to_string());
    }

    let output = ctx.run_bin(&["run", "build", "--json"], &env.app)?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json["status"] != "not_configured" {
        return Err(format!("Unexpected status: {}", json["status"]));
    }
    Ok(())
}

fn scenario_disabled(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env(
        "disabled",
        &format!("{}\nenabled = false\nconstraint = \"<\"\nonly_develop = \"yes\"", SECTION),
    )?;
    let output = ctx.run_bin(&["run", "build", "--json"], &env.app)?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json["status"] != "not_configured" {
        return Err(format!("Unexpected status: {}", json["status"]));
    }
    Ok(())
}

fn scenario_build_rewrites_groups(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("build", SECTION)?;
    let output = ctx.run_bin(&["run", "build"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("# Replacing path dependency lib-a @ file://")?;
    output.assert_stdout_contains("in group main with lib-a (>=1.0.0,<1.1.0)")?;
    output.assert_stdout_contains("in group main with lib-b (>=0.2.0,<0.3.0)")?;
    output.assert_stdout_contains("  pytest")?;
    output.assert_stdout_not_contains("Replacing path dependency requests")?;

    // Without a write target the lock document stays on disk as it was
    let lock = read_file(&env.app.join("poetry.lock"))?;
    if lock != APP_LOCK {
        return Err("poetry.lock changed without --in-place".to_string());
    }
    Ok(())
}

fn scenario_build_json(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("build-json", SECTION)?;
    let output = ctx.run_bin(&["run", "build", "--json"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_not_contains("# Replacing")?;

    let json = parse_json(&output.stdout)?;
    if json["status"] != "rewritten" {
        return Err(format!("Unexpected status: {}", json["status"]));
    }
    let replaced = json["replaced"]
        .as_array()
        .ok_or_else(|| "replaced should be an array".to_string())?;
    if replaced.len() != 2 {
        return Err(format!("Expected 2 replacements, got {}", replaced.len()));
    }
    let main = json["groups"]["main"]
        .as_array()
        .ok_or_else(|| "groups.main should be an array".to_string())?;
    if !main.iter().any(|line| line == "lib-a (>=1.0.0,<1.1.0)") {
        return Err(format!("lib-a not pinned in main group: {:?}", main));
    }
    let rewritten = &json["rewritten_packages"];
    if rewritten != &serde_json::json!(["lib-a", "lib-b"]) {
        return Err(format!("Unexpected rewritten packages: {}", rewritten));
    }
    Ok(())
}

fn scenario_unselected_command(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("unselected", SECTION)?;
    let output = ctx.run_bin(&["run", "lock", "--in-place"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Command lock is not configured")?;

    let lock = read_file(&env.app.join("poetry.lock"))?;
    if lock != APP_LOCK {
        return Err("poetry.lock changed for an unselected command".to_string());
    }
    Ok(())
}

fn scenario_verbose(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("verbose", SECTION)?;
    let output = ctx.run_bin(&["-v", "run", "lock"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains(
        "Not replacing path dependencies with named dependencies for command lock.",
    )?;

    let output = ctx.run_bin(&["run", "build", "--verbose"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Replacing path dependencies with named dependencies.")?;
    Ok(())
}

fn scenario_export_to_file(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("export-file", SECTION)?;
    let output = ctx.run_bin(&["run", "export", "--output", "rewritten.lock"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Wrote rewritten.lock")?;

    let lock = parse_toml(&read_file(&env.app.join("rewritten.lock"))?)?;
    check_rewritten_lock(&lock)?;

    let original = read_file(&env.app.join("poetry.lock"))?;
    if original != APP_LOCK {
        return Err("poetry.lock changed when writing to --output".to_string());
    }
    Ok(())
}

fn scenario_export_to_stdout(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("export-stdout", SECTION)?;
    let output = ctx.run_bin(&["run", "export", "--output", "-"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_not_contains("# Replacing")?;

    let lock = parse_toml(&output.stdout)?;
    check_rewritten_lock(&lock)?;

    let output = ctx.run_bin(&["run", "export", "--output", "-", "--json"], &env.app)?;
    output.assert_failure()?;
    output.assert_stderr_contains("cannot be combined with --json")?;
    Ok(())
}

fn scenario_export_in_place(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("export-in-place", SECTION)?;
    let output = ctx.run_bin(&["run", "export", "--in-place"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Removed source of locked package lib-a")?;
    output.assert_stdout_contains("Removed source of locked package lib-b")?;

    let lock = parse_toml(&read_file(&env.app.join("poetry.lock"))?)?;
    check_rewritten_lock(&lock)?;

    // A second run finds nothing left to rewrite
    let output = ctx.run_bin(&["run", "export", "--json"], &env.app)?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json.get("rewritten_packages").is_some() {
        return Err(format!("Second run rewrote packages again: {}", json));
    }
    Ok(())
}

fn scenario_export_dry_run(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("export-dry-run", SECTION)?;
    let output = ctx.run_bin(&["run", "export", "--in-place", "--dry-run"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("[dry-run] Would write")?;
    output.assert_stdout_contains("[dry-run] Removed source of locked package lib-a")?;

    let lock = read_file(&env.app.join("poetry.lock"))?;
    if lock != APP_LOCK {
        return Err("poetry.lock changed during a dry run".to_string());
    }
    Ok(())
}

fn scenario_only_develop(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("only-develop", &format!("{}\nonly_develop = true", SECTION))?;
    let output = ctx.run_bin(&["run", "export", "--output", "out.lock"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("with lib-a (>=1.0.0,<1.1.0)")?;
    output.assert_stdout_not_contains("Replacing path dependency lib-b")?;

    let lock = parse_toml(&read_file(&env.app.join("out.lock"))?)?;
    let lib_a = locked_package(&lock, "lib-a")?;
    if lib_a.get("source").is_some() {
        return Err("lib-a should have lost its source".to_string());
    }
    let lib_b = locked_package(&lock, "lib-b")?;
    if lib_b.get("source").is_none() {
        return Err("lib-b is not a develop package and should keep its source".to_string());
    }
    let inner = &lib_b["dependencies"]["lib-a"];
    if inner.get("path").is_none() {
        return Err("lib-b was not rewritten, its dependencies should be untouched".to_string());
    }
    Ok(())
}

fn scenario_caret_constraint(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("caret", &format!("{}\nconstraint = \"^\"", SECTION))?;
    let output = ctx.run_bin(&["run", "build"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("with lib-a (>=1.0.0,<2.0.0)")?;
    output.assert_stdout_contains("with lib-b (>=0.2.0,<0.3.0)")?;
    Ok(())
}

fn scenario_missing_lock(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("missing-lock", SECTION)?;
    std::fs::remove_file(env.app.join("poetry.lock"))
        .map_err(|e| format!("Failed to remove poetry.lock: {}", e))?;

    let output = ctx.run_bin(&["run", "export", "--in-place"], &env.app)?;
    output.assert_success()?;
    output.assert_stderr_contains("Failed to find version for path dependency lib-a")?;
    output.assert_stderr_contains("Failed to find version for path dependency lib-b")?;
    output.assert_stderr_contains("No poetry.lock found")?;
    output.assert_stdout_not_contains("# Replacing")?;
    Ok(())
}

fn scenario_invalid_config(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("invalid-config", &format!("{}\nonly_develop = \"yes\"", SECTION))?;
    let output = ctx.run_bin(&["run", "build"], &env.app)?;
    output.assert_failure()?;
    output.assert_stderr_contains("Error: only_develop should be of type")?;

    let env = ctx.create_env("invalid-constraint", &format!("{}\nconstraint = \"<\"", SECTION))?;
    let output = ctx.run_bin(&["config"], &env.app)?;
    output.assert_failure()?;
    output.assert_stderr_contains("Unsupported constraint '<'")?;

    // Unknown source types are kept and just never match
    let env = ctx.create_env("unknown-source-type", &format!("{}\nsource_types = [\"directory\", \"svn\"]", SECTION))?;
    let output = ctx.run_bin(&["run", "build"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("with lib-a (>=1.0.0,<1.1.0)")?;
    Ok(())
}

fn scenario_config_json(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env(
        "config-json",
        &format!("{}\ncommands = [\"export\"]\nsource_types = [\"git\", \"directory\"]", SECTION),
    )?;
    let output = ctx.run_bin(&["config", "--json"], &env.app)?;
    output.assert_success()?;

    let json = parse_json(&output.stdout)?;
    let expected = serde_json::json!({
        "active": true,
        "config": {
            "enabled": true,
            "commands": ["export"],
            "constraint": "~=",
            "source_types": ["directory", "git"],
            "only_develop": false
        }
    });
    if json != expected {
        return Err(format!("Unexpected config output: {}", json));
    }

    let output = ctx.run_bin(&["config"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("commands     = [export]")?;
    output.assert_stdout_contains("constraint   = ~=")?;
    Ok(())
}

fn scenario_config_inactive(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("config-inactive", "")?;
    let output = ctx.run_bin(&["config"], &env.app)?;
    output.assert_success()?;
    output.assert_stdout_contains("Plugin is inactive")?;

    let output = ctx.run_bin(&["config", "--json"], &env.app)?;
    output.assert_success()?;
    let json = parse_json(&output.stdout)?;
    if json != serde_json::json!({"active": false}) {
        return Err(format!("Unexpected config output: {}", json));
    }
    Ok(())
}

fn scenario_project_flag(ctx: &TestContext) -> Result<(), String> {
    let env = ctx.create_env("project-flag", SECTION)?;
    let output = ctx.run_bin(&["--project", "app", "run", "build"], &env.root)?;
    output.assert_success()?;
    output.assert_stdout_contains("with lib-a (>=1.0.0,<1.1.0)")?;

    // Discovery walks up from a nested directory
    let nested = env.app.join("src/app");
    write_file(&nested.join("__init__.py"), "")?;
    let output = ctx.run_bin(&["run", "build"], &nested)?;
    output.assert_success()?;
    output.assert_stdout_contains("with lib-b (>=0.2.0,<0.3.0)")?;
    Ok(())
}

/// Checks shared by every scenario that writes the rewritten lock document
fn check_rewritten_lock(lock: &toml::Value) -> Result<(), String> {
    for name in ["lib-a", "lib-b"] {
        let package = locked_package(lock, name)?;
        if package.get("source").is_some() || package.get("develop").is_some() {
            return Err(format!("{} still has source or develop: {}", name, package));
        }
    }

    let inner = &locked_package(lock, "lib-b")?["dependencies"]["lib-a"];
    let expected: toml::Value = toml::from_str("version = \"1.0.0\"")
        .map_err(|e| format!("Invalid expectation: {}", e))?;
    if inner != &expected {
        return Err(format!("lib-b's dependency on lib-a not pinned: {}", inner));
    }

    let requests = locked_package(lock, "requests")?;
    if requests.get("version").and_then(|v| v.as_str()) != Some("2.31.0") {
        return Err("requests record changed".to_string());
    }
    if lock.get("metadata").and_then(|m| m.get("content-hash")).is_none() {
        return Err("metadata section lost".to_string());
    }
    Ok(())
}
