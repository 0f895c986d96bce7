//! jq filters over the playbook artifact.
//!
//! Filters are compiled with jaq using the jq standard library. A compiled
//! filter is not `Send`, so it is rebuilt for each call rather than cached
//! across an await point.

use crate::runner::error::{ErrorCode, RunError, RunResult};
use jaq_core::box_iter::{box_once, BoxIter};
use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, Error, Exn, Filter, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;
use std::cell::Cell;

/// Error message `input` and `inputs` raise; a query sees only the artifact.
const NO_MORE_INPUTS: &str = "No more inputs";

thread_local! {
    /// Set by `halt` and `halt_error`, which stop the filter in place of
    /// exiting the process. Filters cannot reach it, so a user `error(...)`
    /// is never mistaken for a halt.
    static HALTED: Cell<bool> = const { Cell::new(false) };
}

fn halt<'a>() -> BoxIter<'a, Result<Val, Exn<'a, Val>>> {
    HALTED.with(|halted| halted.set(true));
    box_once(Err(Exn::from(Error::new(Val::Null))))
}

/// Standard natives, with the process-exiting ones replaced.
fn natives() -> impl Iterator<Item = jaq_std::Filter<Native<Val>>> {
    let halting: [jaq_std::Filter<Native<Val>>; 2] = [
        ("halt", jaq_std::v(0), Native::new(|_, _| halt())),
        ("halt_error", jaq_std::v(1), Native::new(|_, _| halt())),
    ];
    jaq_std::funs()
        .filter(|(name, _, _)| !matches!(*name, "halt" | "halt_error"))
        .chain(jaq_json::funs())
        .chain(halting)
}

fn compile(filter: &str) -> RunResult<Filter<Native<Val>>> {
    let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = Arena::default();
    let modules = loader
        .load(&arena, File { code: filter, path: () })
        .map_err(|errs| {
            let details: Vec<String> = errs.iter().map(|(_, err)| format!("{err:?}")).collect();
            syntax_error(filter, &details)
        })?;
    Compiler::default()
        .with_funs(natives())
        .compile(modules)
        .map_err(|errs| {
            let details: Vec<String> = errs
                .iter()
                .flat_map(|(_, undefined)| undefined.iter())
                .map(|(name, kind)| format!("undefined {kind:?} `{name}`"))
                .collect();
            syntax_error(filter, &details)
        })
}

fn syntax_error(filter: &str, details: &[String]) -> RunError {
    RunError::validation(
        ErrorCode::FilterSyntax,
        "artifact query filter does not compile",
        serde_json::json!({"filter": filter, "errors": details}),
    )
}

/// Check that `filter` compiles.
pub fn validate(filter: &str) -> RunResult<()> {
    compile(filter).map(|_| ())
}

/// Run `filter` against `document`, returning each output JSON-encoded.
pub fn evaluate(filter: &str, document: &Value) -> RunResult<Vec<String>> {
    let compiled = compile(filter)?;
    let inputs = RcIter::new(core::iter::once(Err::<Val, _>(NO_MORE_INPUTS.to_string())));
    HALTED.with(|halted| halted.set(false));

    let mut results = Vec::new();
    for output in compiled.run((Ctx::new([], &inputs), Val::from(document.clone()))) {
        match output {
            Ok(value) => {
                let json = Value::from(value);
                let encoded = serde_json::to_string(&json).map_err(|err| {
                    RunError::io(ErrorCode::Query, "failed to encode query result", err)
                })?;
                results.push(encoded);
            }
            Err(_) if HALTED.with(Cell::take) => break,
            Err(err) => {
                return Err(RunError::post_processing(
                    ErrorCode::Query,
                    "artifact query failed",
                    serde_json::json!({"filter": filter, "error": err.to_string()}),
                ))
            }
        }
    }
    Ok(results)
}
