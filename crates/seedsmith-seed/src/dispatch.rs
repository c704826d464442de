//! Resolve a seeder target and run it.

use tracing::info;

use seedsmith_core::DatabaseSchema;

use crate::allocator::AllocatorOptions;
use crate::error::Result;
use crate::faker::ValueSource;
use crate::flush::FlushOptions;
use crate::seeder::{DATABASE_SEEDER, DEFAULT_METHOD, DatabaseSeeder, SeederRegistry, SeederRun};
use crate::session::{SeedSession, SessionOptions};
use crate::target::SeedTarget;

pub const DEFAULT_ROW_COUNT: u64 = 10;

const SEEDER_SUFFIX: &str = "TableSeeder";

/// `Name` or `Name:method`, split and trimmed. Empty parts are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeederTarget {
    pub name: Option<String>,
    pub method: Option<String>,
}

impl SeederTarget {
    pub fn parse(target: &str) -> Self {
        let (name, method) = match target.split_once(':') {
            Some((name, method)) => (name, Some(method)),
            None => (target, None),
        };
        let non_empty = |part: &str| {
            let part = part.trim();
            (!part.is_empty()).then(|| part.to_string())
        };
        Self {
            name: non_empty(name),
            method: method.and_then(non_empty),
        }
    }

    pub fn method(&self) -> &str {
        self.method.as_deref().unwrap_or(DEFAULT_METHOD)
    }

    /// Registry name: `users` and `Users` resolve `UsersTableSeeder`.
    pub fn seeder_name(&self) -> Option<String> {
        let name = self.name.as_deref()?;
        if name == DATABASE_SEEDER || name.ends_with(SEEDER_SUFFIX) {
            return Some(name.to_string());
        }
        let mut chars = name.chars();
        let capitalized: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        Some(format!("{capitalized}{SEEDER_SUFFIX}"))
    }

    fn is_umbrella(&self) -> bool {
        self.name.is_none() || self.name.as_deref() == Some(DATABASE_SEEDER)
    }
}

pub fn parse_target(target: &str) -> SeederTarget {
    SeederTarget::parse(target)
}

/// What the caller asked for. `None` defers to the configured value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchRequest {
    pub target: Option<String>,
    pub row_count: Option<u64>,
    pub skip_truncate: Option<bool>,
}

/// Values from the settings file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedDefaults {
    pub row_count: Option<u64>,
    pub skip_truncate: Option<bool>,
    pub max_rows_per_statement: Option<usize>,
    pub allocator: AllocatorOptions,
}

/// Row count and truncate flag after precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedParameters {
    pub row_count: u64,
    pub skip_truncate: bool,
}

impl DispatchRequest {
    /// Explicit request value, then the configured one, then the default.
    pub fn resolve(&self, defaults: &SeedDefaults) -> ResolvedParameters {
        ResolvedParameters {
            row_count: self
                .row_count
                .or(defaults.row_count)
                .unwrap_or(DEFAULT_ROW_COUNT),
            skip_truncate: self
                .skip_truncate
                .or(defaults.skip_truncate)
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed(Vec<SeederRun>),
    /// Nothing ran; the reason was logged.
    Unresolved { seeder: String, method: String },
}

/// Runs requests against a registry.
pub struct Dispatcher<'r> {
    registry: &'r SeederRegistry,
    schema: Option<&'r DatabaseSchema>,
    defaults: SeedDefaults,
}

impl<'r> Dispatcher<'r> {
    pub fn new(registry: &'r SeederRegistry, defaults: SeedDefaults) -> Self {
        Self {
            registry,
            schema: None,
            defaults,
        }
    }

    /// Snapshot used to order the umbrella run.
    pub fn with_schema(mut self, schema: &'r DatabaseSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn defaults(&self) -> &SeedDefaults {
        &self.defaults
    }

    fn session_options(&self, parameters: ResolvedParameters) -> SessionOptions {
        let mut flush = FlushOptions {
            skip_truncate: parameters.skip_truncate,
            ..FlushOptions::default()
        };
        if let Some(max) = self.defaults.max_rows_per_statement {
            flush.max_rows_per_statement = max.max(1);
        }
        SessionOptions {
            flush,
            allocator: self.defaults.allocator,
        }
    }

    pub async fn dispatch(
        &self,
        db: &mut dyn SeedTarget,
        values: &mut dyn ValueSource,
        request: &DispatchRequest,
    ) -> Result<DispatchOutcome> {
        let target = request
            .target
            .as_deref()
            .map(SeederTarget::parse)
            .unwrap_or_default();
        let method = target.method().to_string();
        let parameters = request.resolve(&self.defaults);
        let options = self.session_options(parameters);

        if target.is_umbrella() {
            let mut umbrella = DatabaseSeeder::new(self.registry);
            if let Some(schema) = self.schema {
                umbrella = umbrella.with_schema(schema);
            }
            if self.registry.is_empty() {
                return Ok(unresolved(DATABASE_SEEDER, &method));
            }
            if !umbrella.methods().contains(&method.as_str()) {
                return Ok(unknown_method(DATABASE_SEEDER, &method));
            }
            let runs = umbrella
                .run(db, values, &method, parameters.row_count, options)
                .await?;
            return Ok(DispatchOutcome::Completed(runs));
        }

        let name = target.seeder_name().unwrap_or_default();
        let Some(seeder) = self.registry.get(&name) else {
            return Ok(unresolved(&name, &method));
        };
        if !seeder.has_method(&method) {
            return Ok(unknown_method(&name, &method));
        }

        let report =
            SeedSession::execute(db, values, seeder, &method, parameters.row_count, options)
                .await?;
        Ok(DispatchOutcome::Completed(vec![SeederRun {
            seeder: name,
            report,
        }]))
    }
}

fn unresolved(seeder: &str, method: &str) -> DispatchOutcome {
    info!(event = "seeder_unresolved", seeder, method, "Class {seeder} not exists.");
    DispatchOutcome::Unresolved {
        seeder: seeder.to_string(),
        method: method.to_string(),
    }
}

fn unknown_method(seeder: &str, method: &str) -> DispatchOutcome {
    info!(
        event = "method_unresolved",
        seeder,
        method,
        "Method {method} not exists in class {seeder}."
    );
    DispatchOutcome::Unresolved {
        seeder: seeder.to_string(),
        method: method.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::Row;
    use crate::seeder::TableSeeder;
    use crate::testing::{FixedValueSource, MemoryTarget, table};
    use async_trait::async_trait;
    use seedsmith_core::Dialect;

    struct TagsSeeder;

    #[async_trait]
    impl TableSeeder for TagsSeeder {
        fn name(&self) -> &str {
            "TagsTableSeeder"
        }

        async fn run(&self, session: &mut SeedSession<'_>, count: u64) -> Result<()> {
            for idx in 0..count {
                session
                    .insert("tags", Row::new().with("label", format!("tag {idx}")))
                    .await?;
            }
            Ok(())
        }
    }

    fn registry() -> SeederRegistry {
        let mut registry = SeederRegistry::new();
        registry.register(Box::new(TagsSeeder));
        registry
    }

    fn target() -> MemoryTarget {
        MemoryTarget::new(Dialect::MySql).with_table(table(
            "tags",
            &[("id", "int", true), ("label", "varchar(40)", false)],
        ))
    }

    fn request(target: &str) -> DispatchRequest {
        DispatchRequest {
            target: Some(target.to_string()),
            ..DispatchRequest::default()
        }
    }

    #[test]
    fn parses_targets() {
        assert_eq!(
            SeederTarget::parse("Users:plan"),
            SeederTarget {
                name: Some("Users".to_string()),
                method: Some("plan".to_string()),
            }
        );
        assert_eq!(SeederTarget::parse("Users").method(), "run");
        assert_eq!(SeederTarget::parse(" :plan ").name, None);
        assert_eq!(SeederTarget::parse("Users:").method, None);
        assert_eq!(
            parse_target("users").seeder_name().as_deref(),
            Some("UsersTableSeeder")
        );
        assert_eq!(
            parse_target("UsersTableSeeder").seeder_name().as_deref(),
            Some("UsersTableSeeder")
        );
    }

    #[test]
    fn explicit_values_win_over_configuration() {
        let configured = SeedDefaults {
            row_count: Some(50),
            skip_truncate: Some(true),
            ..SeedDefaults::default()
        };

        let none = DispatchRequest::default();
        assert_eq!(
            none.resolve(&SeedDefaults::default()),
            ResolvedParameters {
                row_count: 10,
                skip_truncate: false
            }
        );
        assert_eq!(none.resolve(&configured).row_count, 50);
        assert!(none.resolve(&configured).skip_truncate);

        let explicit = DispatchRequest {
            row_count: Some(10),
            skip_truncate: Some(false),
            ..DispatchRequest::default()
        };
        assert_eq!(
            explicit.resolve(&configured),
            ResolvedParameters {
                row_count: 10,
                skip_truncate: false
            }
        );
    }

    #[tokio::test]
    async fn runs_named_seeder() {
        let registry = registry();
        let mut db = target();
        let mut values = FixedValueSource;
        let mut request = request("Tags");
        request.row_count = Some(2);

        let outcome = Dispatcher::new(&registry, SeedDefaults::default())
            .dispatch(&mut db, &mut values, &request)
            .await
            .unwrap();

        let DispatchOutcome::Completed(runs) = outcome else {
            panic!("expected completed dispatch");
        };
        assert_eq!(runs[0].seeder, "TagsTableSeeder");
        assert_eq!(runs[0].report.rows_for("tags"), Some(2));
        assert_eq!(
            db.executed,
            [
                "SET FOREIGN_KEY_CHECKS = 0",
                "TRUNCATE TABLE `tags`",
                "SET FOREIGN_KEY_CHECKS = 1",
                "INSERT INTO `tags` (`label`) VALUES ('tag 0'), ('tag 1')",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_seeder_or_method_is_unresolved() {
        let registry = registry();
        let mut db = target();
        let mut values = FixedValueSource;
        let dispatcher = Dispatcher::new(&registry, SeedDefaults::default());

        let outcome = dispatcher
            .dispatch(&mut db, &mut values, &request("Missing"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Unresolved {
                seeder: "MissingTableSeeder".to_string(),
                method: "run".to_string(),
            }
        );

        let outcome = dispatcher
            .dispatch(&mut db, &mut values, &request("Tags:plan"))
            .await
            .unwrap();
        assert!(matches!(outcome, DispatchOutcome::Unresolved { ref method, .. } if method == "plan"));
        assert!(db.executed.is_empty());
    }

    #[tokio::test]
    async fn empty_target_runs_umbrella() {
        let registry = registry();
        let mut db = target();
        let mut values = FixedValueSource;
        let request = DispatchRequest {
            row_count: Some(1),
            skip_truncate: Some(true),
            ..DispatchRequest::default()
        };

        let outcome = Dispatcher::new(&registry, SeedDefaults::default())
            .dispatch(&mut db, &mut values, &request)
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Completed(ref runs) if runs.len() == 1));
        assert_eq!(db.executed, ["INSERT INTO `tags` (`label`) VALUES ('tag 0')"]);
    }

    #[tokio::test]
    async fn empty_registry_leaves_umbrella_unresolved() {
        let registry = SeederRegistry::new();
        let mut db = target();
        let mut values = FixedValueSource;

        let outcome = Dispatcher::new(&registry, SeedDefaults::default())
            .dispatch(&mut db, &mut values, &request("DatabaseSeeder"))
            .await
            .unwrap();

        assert!(matches!(outcome, DispatchOutcome::Unresolved { ref seeder, .. } if seeder == "DatabaseSeeder"));
    }
}
