use strum_macros::{Display, EnumIter};
use tracing::debug;

use crate::{context::Context, router::Pattern};

/// Hook points of the dispatch pipeline, in the order they fire.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    BeforeStatic,
    BeforeRouter,
    BeforeExec,
    AfterExec,
}

pub type FilterFn = Box<dyn Fn(&mut Context<'_>) + Send + Sync>;

struct FilterEntry {
    pattern: Pattern,
    handler: FilterFn,
    return_on_output: bool,
}

pub struct FilterChain {
    stages: [Vec<FilterEntry>; 4],
}

impl FilterChain {
    pub fn new() -> Self {
        Self {
            stages: Default::default(),
        }
    }

    /// Appends a filter to `stage`. With `return_on_output` set, the pipeline
    /// stops as soon as the filter has written a response.
    pub fn insert(
        &mut self,
        stage: Stage,
        pattern: Pattern,
        handler: impl Fn(&mut Context<'_>) + Send + Sync + 'static,
        return_on_output: bool,
    ) {
        self.stages[stage as usize].push(FilterEntry {
            pattern,
            handler: Box::new(handler),
            return_on_output,
        });
    }

    pub fn len(&self, stage: Stage) -> usize {
        self.stages[stage as usize].len()
    }

    /// Runs every filter of `stage` whose pattern matches the request path,
    /// in insertion order. Returns true when the pipeline must stop.
    pub fn run(&self, stage: Stage, ctx: &mut Context<'_>) -> bool {
        let path = ctx.path().to_owned();
        for entry in &self.stages[stage as usize] {
            if !entry.pattern.matches(&path) {
                continue;
            }

            debug!(%stage, pattern = entry.pattern.as_str(), "filter");
            (entry.handler)(ctx);
            if entry.return_on_output && ctx.is_started() {
                return true;
            }
        }
        false
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}
