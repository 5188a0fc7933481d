//! Shared fixtures for integration tests

use std::path::Path;

use utagent::config::CacheConfig;
use utagent::model::{ClassInfo, MethodInfo, Visibility};

/// Cache config rooted in a temp dir with test-friendly bounds
pub fn cache_config(dir: &Path) -> CacheConfig {
    CacheConfig {
        enabled: true,
        directory: dir.join(".utagent-cache"),
        max_age_minutes: 60,
        max_size_mb: 10,
    }
}

/// Calculator with public add/subtract
pub fn calculator() -> ClassInfo {
    let method = |name: &str| MethodInfo {
        name: name.into(),
        visibility: Visibility::Public,
        is_abstract: false,
    };
    ClassInfo {
        package: "com.example".into(),
        name: "Calculator".into(),
        methods: vec![method("add"), method("subtract")],
    }
}

/// JaCoCo report with add fully covered and subtract fully missed
pub const CALCULATOR_JACOCO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<report name="demo">
  <package name="com/example">
    <class name="com/example/Calculator" sourcefilename="Calculator.java">
      <method name="add" desc="(II)I" line="5">
        <counter type="INSTRUCTION" missed="0" covered="4"/>
        <counter type="LINE" missed="0" covered="2"/>
      </method>
      <method name="subtract" desc="(II)I" line="9">
        <counter type="INSTRUCTION" missed="4" covered="0"/>
        <counter type="LINE" missed="2" covered="0"/>
      </method>
    </class>
  </package>
</report>
"#;

/// Write the sample report at the Maven location under `project_root`
pub fn write_maven_report(project_root: &Path) {
    let path = project_root.join("target/site/jacoco/jacoco.xml");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, CALCULATOR_JACOCO).unwrap();
}
