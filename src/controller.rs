use std::{collections::HashMap, str::FromStr, sync::Arc};

use anyhow::anyhow;
use strum::IntoEnumIterator;
use thiserror::Error;

use crate::{
    context::Context, router::RouteError, server::HttpMethod, status_code_registry::ReasonPhrase,
};

/// Stops an action early. The dispatcher answers with the error page
/// registered for [`Abort::code`].
#[derive(Error, Debug)]
pub enum Abort {
    #[error("aborted with status {0}")]
    Status(u16),
    #[error("aborted with code {0:?}")]
    Code(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Abort {
    pub fn code(&self) -> String {
        match self {
            Abort::Status(status) => status.to_string(),
            Abort::Code(code) => code.clone(),
            Abort::Internal(_) => "500".to_owned(),
        }
    }
}

pub type Outcome = Result<(), Abort>;

/// A named action beyond the seven verb methods, see [`Controller::actions`].
pub type ActionFn<C> = fn(&mut C, &mut Context<'_>) -> Outcome;

/// Request handler with hooks around its actions. A fresh value is built
/// for every request that routes to it.
///
/// Every verb method answers 405 unless overridden.
pub trait Controller: 'static {
    fn init(&mut self, _ctx: &mut Context<'_>) {}

    /// Runs before the action, after the anti-forgery check.
    fn prepare(&mut self, _ctx: &mut Context<'_>) {}

    /// Returning false skips the action, rendering and after-exec filters.
    fn filter(&mut self, _ctx: &mut Context<'_>) -> bool {
        true
    }

    fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn post(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn put(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn delete(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn patch(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn options(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn head(&mut self, ctx: &mut Context<'_>) -> Outcome {
        method_not_allowed(ctx)
    }

    fn finish(&mut self, _ctx: &mut Context<'_>) {}

    fn render(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        ctx.render()
    }

    /// Named actions that method mappings such as `"get,post:List"` may
    /// refer to.
    fn actions() -> Vec<(&'static str, ActionFn<Self>)>
    where
        Self: Sized,
    {
        vec![]
    }
}

fn method_not_allowed(ctx: &mut Context<'_>) -> Outcome {
    let w = ctx.response();
    w.set_reason_phrase(ReasonPhrase::MethodNotAllowed);
    w.set_body_str(ReasonPhrase::MethodNotAllowed.as_str());
    Ok(())
}

/// The action a verb resolves to, fixed when the route is registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Verb(HttpMethod),
    Custom { index: usize, name: &'static str },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Verb(http_method) => http_method.title(),
            Action::Custom { name, .. } => *name,
        }
    }
}

/// Object-safe view of a controller instance.
pub trait Invoke {
    fn init(&mut self, ctx: &mut Context<'_>);
    fn prepare(&mut self, ctx: &mut Context<'_>);
    fn filter(&mut self, ctx: &mut Context<'_>) -> bool;
    fn call(&mut self, action: Action, ctx: &mut Context<'_>) -> Outcome;
    fn finish(&mut self, ctx: &mut Context<'_>);
    fn render(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()>;
}

struct Instance<C> {
    controller: C,
    actions: Arc<[ActionFn<C>]>,
}

impl<C: Controller> Invoke for Instance<C> {
    fn init(&mut self, ctx: &mut Context<'_>) {
        self.controller.init(ctx)
    }

    fn prepare(&mut self, ctx: &mut Context<'_>) {
        self.controller.prepare(ctx)
    }

    fn filter(&mut self, ctx: &mut Context<'_>) -> bool {
        self.controller.filter(ctx)
    }

    fn call(&mut self, action: Action, ctx: &mut Context<'_>) -> Outcome {
        let c = &mut self.controller;
        match action {
            Action::Verb(HttpMethod::Get) => c.get(ctx),
            Action::Verb(HttpMethod::Post) => c.post(ctx),
            Action::Verb(HttpMethod::Put) => c.put(ctx),
            Action::Verb(HttpMethod::Delete) => c.delete(ctx),
            Action::Verb(HttpMethod::Patch) => c.patch(ctx),
            Action::Verb(HttpMethod::Options) => c.options(ctx),
            Action::Verb(HttpMethod::Head) => c.head(ctx),
            Action::Custom { index, name } => match self.actions.get(index) {
                Some(action) => action(c, ctx),
                None => Err(anyhow!("no action {} at index {}", name, index).into()),
            },
        }
    }

    fn finish(&mut self, ctx: &mut Context<'_>) {
        self.controller.finish(ctx)
    }

    fn render(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<()> {
        self.controller.render(ctx)
    }
}

type Factory = Box<dyn Fn() -> Box<dyn Invoke> + Send + Sync>;

/// A controller type bound to its method mappings.
pub struct Endpoint {
    controller_name: &'static str,
    methods: HashMap<String, Action>,
    factory: Factory,
}

impl Endpoint {
    pub fn new<C: Controller + Default>(mappings: &[&str]) -> Result<Self, RouteError> {
        Self::with_factory(C::default, mappings)
    }

    /// Mappings look like `"get,post:Name"`, several may be joined with `;`
    /// and `*` stands for any verb. `Name` is a verb method (`Get`, `Post`,
    /// ...) or one of [`Controller::actions`]. Without mappings verbs resolve
    /// to their own method.
    pub fn with_factory<C, F>(factory: F, mappings: &[&str]) -> Result<Self, RouteError>
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let named = C::actions();
        let names: Vec<&'static str> = named.iter().map(|(name, _)| *name).collect();
        let methods = parse_mappings(mappings, &names)?;
        let actions: Arc<[ActionFn<C>]> = named.into_iter().map(|(_, action)| action).collect();

        Ok(Self {
            controller_name: short_type_name::<C>(),
            methods,
            factory: Box::new(move || {
                Box::new(Instance {
                    controller: factory(),
                    actions: Arc::clone(&actions),
                }) as Box<dyn Invoke>
            }),
        })
    }

    pub fn controller_name(&self) -> &'static str {
        self.controller_name
    }

    /// The action for a lower-cased verb, or `None` when this route does
    /// not handle it.
    pub fn resolve(&self, verb: &str) -> Option<Action> {
        if self.methods.is_empty() {
            return HttpMethod::from_str(verb).ok().map(Action::Verb);
        }
        self.methods
            .get(verb)
            .or_else(|| self.methods.get("*"))
            .copied()
    }

    pub fn instantiate(&self) -> Box<dyn Invoke> {
        (self.factory)()
    }
}

fn short_type_name<C>() -> &'static str {
    let name = std::any::type_name::<C>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

fn parse_mappings(
    mappings: &[&str],
    names: &[&'static str],
) -> Result<HashMap<String, Action>, RouteError> {
    let mut methods = HashMap::new();
    for mapping in mappings.iter().flat_map(|m| m.split(';')) {
        let mapping = mapping.trim();
        if mapping.is_empty() {
            continue;
        }

        let (verbs, method) = mapping
            .split_once(':')
            .ok_or_else(|| RouteError::MalformedMapping(mapping.to_owned()))?;
        let action = resolve_action(method.trim(), names)?;

        for verb in verbs.split(',') {
            let verb = verb.trim().to_lowercase();
            if verb != "*" && HttpMethod::from_str(&verb).is_err() {
                return Err(RouteError::UnknownVerb(verb));
            }
            methods.insert(verb, action);
        }
    }
    Ok(methods)
}

fn resolve_action(method: &str, names: &[&'static str]) -> Result<Action, RouteError> {
    if let Some(http_method) = HttpMethod::iter().find(|m| m.title() == method) {
        return Ok(Action::Verb(http_method));
    }
    names
        .iter()
        .position(|name| *name == method)
        .map(|index| Action::Custom {
            index,
            name: names[index],
        })
        .ok_or_else(|| RouteError::UnknownAction(method.to_owned()))
}
