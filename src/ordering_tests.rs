//! End-to-end ordering tests for the ignition generator.
//!
//! These drive the pure pipeline core over in-memory unit sets and verify
//! the invariants the generated artifact must uphold:
//! - invocation priorities are non-decreasing;
//! - equal priorities keep source/discovery order;
//! - lookalike markers and invalid shapes never reach the artifact;
//! - nothing is emitted when there is nothing to order;
//! - repeated runs are byte-identical.

#[cfg(test)]
mod tests {
    use crate::discovery::SourceUnit;
    use crate::pipeline::{plan_from_units, PipelineConfig, StartupPlan};
    use crate::validate::{ERR_MARKER_CORRUPT, ERR_MARKER_REPEATED, ERR_PRIORITY_MALFORMED};
    use std::path::PathBuf;

    const MARKER_SRC: &str = "export function Startup(priority = 0) {\n\
                              \x20 return (_target, _key, _desc) => {};\n\
                              }\n\
                              export const StartupAttribute = Startup;\n";

    fn unit(path: &str, source: &str) -> SourceUnit {
        SourceUnit {
            path: PathBuf::from(path),
            source: source.to_string(),
        }
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            root: PathBuf::from("/proj"),
            marker_module: "startup".to_string(),
            marker_name: "Startup".to_string(),
            out_file: "startup.generated.ts".to_string(),
        }
    }

    fn plan(units: &[SourceUnit]) -> StartupPlan {
        plan_from_units(units, &config()).expect("pipeline should succeed")
    }

    fn qualified_names(plan: &StartupPlan) -> Vec<String> {
        plan.entries.iter().map(|e| e.qualified_name.clone()).collect()
    }

    #[test]
    fn test_five_priorities_invoke_lowest_first() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/jobs.ts",
                "import { Startup } from '../startup';\n\
                 export class Jobs {\n\
                   @Startup(0)\n  static a() {}\n\
                   @Startup(-5)\n  static b() {}\n\
                   @Startup(2)\n  static c() {}\n\
                   @Startup(10)\n  static d() {}\n\
                   @Startup(-10)\n  static e() {}\n\
                 }\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(
            qualified_names(&plan),
            vec!["Jobs.e", "Jobs.b", "Jobs.a", "Jobs.c", "Jobs.d"]
        );
        assert!(plan
            .entries
            .windows(2)
            .all(|w| w[0].priority <= w[1].priority));

        let code = &plan.generated.as_ref().unwrap().code;
        let positions: Vec<usize> = ["e", "b", "a", "c", "d"]
            .iter()
            .map(|m| code.find(&format!(".{}();", m)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_default_priority_ties_keep_source_order() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n\
                   @Startup()\n  static x() {}\n\
                   @Startup()\n  static y() {}\n\
                 }\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(qualified_names(&plan), vec!["App.x", "App.y"]);
    }

    #[test]
    fn test_bare_marker_equals_explicit_zero() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n\
                   @Startup\n  static bare() {}\n\
                   @Startup(0)\n  static explicit() {}\n\
                   @Startup(-1)\n  static early() {}\n\
                 }\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(
            qualified_names(&plan),
            vec!["App.early", "App.bare", "App.explicit"]
        );
        assert_eq!(plan.entries[1].priority, 0);
        assert_eq!(plan.entries[2].priority, 0);
    }

    #[test]
    fn test_discovery_order_spans_units() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/a.ts",
                "import { Startup } from '../startup';\n\
                 export class A {\n  @Startup()\n  static init() {}\n}\n",
            ),
            unit(
                "/proj/src/b.ts",
                "import { Startup } from '../startup';\n\
                 export class B {\n  @Startup()\n  static init() {}\n}\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(qualified_names(&plan), vec!["A.init", "B.init"]);
    }

    #[test]
    fn test_lookalike_marker_never_appears() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/fake.ts",
                "export function Startup(_p = 0) {\n  return () => {};\n}\n",
            ),
            unit(
                "/proj/src/real.ts",
                "import { Startup } from '../startup';\n\
                 export class Real {\n  @Startup(1)\n  static init() {}\n}\n",
            ),
            unit(
                "/proj/src/fake_user.ts",
                "import { Startup } from '../fake';\n\
                 export class FakeUser {\n  @Startup(0)\n  static init() {}\n}\n",
            ),
            unit(
                "/proj/src/local_user.ts",
                "function Startup(_p) { return () => {}; }\n\
                 export class LocalUser {\n  @Startup(0)\n  static init() {}\n}\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(qualified_names(&plan), vec!["Real.init"]);
        let code = &plan.generated.as_ref().unwrap().code;
        assert!(!code.contains("FakeUser"));
        assert!(!code.contains("LocalUser"));
    }

    #[test]
    fn test_invalid_shapes_never_appear() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n\
                   @Startup()\n  instanceInit() {}\n\
                   @Startup()\n  static generic<T>() {}\n\
                   @Startup()\n  static ok() {}\n\
                 }\n\
                 export class Box<T> {\n  @Startup()\n  static init() {}\n}\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(qualified_names(&plan), vec!["App.ok"]);
    }

    #[test]
    fn test_zero_marked_declarations_produce_no_artifact() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n  static init() {}\n}\n",
            ),
        ];

        let plan = plan(&units);
        assert!(plan.marker_found);
        assert!(plan.entries.is_empty());
        assert!(plan.generated.is_none());
    }

    #[test]
    fn test_missing_marker_module_is_inert() {
        let units = vec![unit(
            "/proj/src/app.ts",
            "export class App {\n  static init() {}\n}\n",
        )];

        let plan = plan(&units);
        assert!(!plan.marker_found);
        assert!(plan.generated.is_none());
    }

    #[test]
    fn test_corrupt_marker_aborts_the_pass() {
        let units = vec![
            unit("/proj/startup.ts", "export const Startup = 42;\n"),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n  @Startup(1)\n  static init() {}\n}\n",
            ),
        ];

        let err = plan_from_units(&units, &config()).unwrap_err();
        assert_eq!(err.code, ERR_MARKER_CORRUPT);
    }

    #[test]
    fn test_repeated_marker_aborts_the_pass() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup, StartupAttribute } from '../startup';\n\
                 export class App {\n\
                   @Startup(1)\n  @StartupAttribute(2)\n  static init() {}\n\
                 }\n",
            ),
        ];

        let err = plan_from_units(&units, &config()).unwrap_err();
        assert_eq!(err.code, ERR_MARKER_REPEATED);
    }

    #[test]
    fn test_malformed_priority_aborts_the_pass() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n  @Startup('high')\n  static init() {}\n}\n",
            ),
        ];

        let err = plan_from_units(&units, &config()).unwrap_err();
        assert_eq!(err.code, ERR_PRIORITY_MALFORMED);
    }

    #[test]
    fn test_namespace_and_suffix_spellings_participate() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import * as boot from '../startup';\n\
                 import { StartupAttribute } from '../startup';\n\
                 export class App {\n\
                   @boot.Startup(2)\n  static second() {}\n\
                   @StartupAttribute(1)\n  static first() {}\n\
                 }\n",
            ),
        ];

        let plan = plan(&units);
        assert_eq!(qualified_names(&plan), vec!["App.first", "App.second"]);
    }

    #[test]
    fn test_repeated_runs_are_byte_identical() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n\
                   @Startup(3)\n  static later() {}\n\
                   @Startup(-3)\n  static sooner() {}\n\
                 }\n",
            ),
        ];

        let first = plan(&units).generated.unwrap().code;
        let second = plan(&units).generated.unwrap().code;
        assert_eq!(first, second);
    }

    #[test]
    fn test_generated_unit_invokes_exactly_once() {
        let units = vec![
            unit("/proj/startup.ts", MARKER_SRC),
            unit(
                "/proj/src/app.ts",
                "import { Startup } from '../startup';\n\
                 export class App {\n  @Startup()\n  static init() {}\n}\n",
            ),
        ];

        let code = plan(&units).generated.unwrap().code;
        // One top-level auto-invocation, plus a module-local re-entry guard.
        assert_eq!(code.matches("runStartup();").count(), 1);
        assert_eq!(code.matches("export function runStartup()").count(), 1);
        assert!(code.contains("if (invoked) {"));
        assert!(code.contains("invoked = true;"));
    }
}
