use std::{
    any::Any,
    backtrace::Backtrace,
    cell::{Cell, RefCell},
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    str::FromStr,
    sync::Once,
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use strum::IntoEnumIterator;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    context::Context,
    controller::{Abort, Controller, Endpoint},
    error_handlers::ErrorHandlers,
    file_server,
    filter::{FilterChain, Stage},
    render::Renderer,
    request::Request,
    response_writer::ResponseWriter,
    router::{Lookup, Match, Pattern, RouteError, Router},
    server::{Handler, HttpMethod},
    status_code_registry::ReasonPhrase,
};

/// Collects routes, filters, error pages and settings. Nothing can be
/// registered once [`AppBuilder::build`] has frozen it into an [`App`].
pub struct AppBuilder {
    config: Config,
    router: Router,
    filters: FilterChain,
    error_handlers: ErrorHandlers,
    renderer: Option<Box<dyn Renderer + Send + Sync>>,
}

impl AppBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            router: Router::new(config.case_sensitive),
            config,
            filters: FilterChain::new(),
            error_handlers: ErrorHandlers::new(),
            renderer: None,
        }
    }

    pub fn try_add_route<C: Controller + Default>(
        &mut self,
        pattern: &str,
        mappings: &[&str],
    ) -> Result<&mut Self, RouteError> {
        let endpoint = Endpoint::new::<C>(mappings)?;
        self.router.add_route(pattern, endpoint)?;
        Ok(self)
    }

    /// Registers `C` under `pattern`. A bad pattern or mapping is logged and
    /// the route left out.
    pub fn add_route<C: Controller + Default>(
        &mut self,
        pattern: &str,
        mappings: &[&str],
    ) -> &mut Self {
        if let Err(err) = self.try_add_route::<C>(pattern, mappings) {
            error!(pattern, %err, "route dropped");
        }
        self
    }

    pub fn try_add_route_with<C, F>(
        &mut self,
        pattern: &str,
        factory: F,
        mappings: &[&str],
    ) -> Result<&mut Self, RouteError>
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        let endpoint = Endpoint::with_factory(factory, mappings)?;
        self.router.add_route(pattern, endpoint)?;
        Ok(self)
    }

    /// Like [`AppBuilder::add_route`] for controllers that are not built
    /// with `Default`.
    pub fn add_route_with<C, F>(
        &mut self,
        pattern: &str,
        factory: F,
        mappings: &[&str],
    ) -> &mut Self
    where
        C: Controller,
        F: Fn() -> C + Send + Sync + 'static,
    {
        if let Err(err) = self.try_add_route_with(pattern, factory, mappings) {
            error!(pattern, %err, "route dropped");
        }
        self
    }

    /// Adds a filter that ends the request as soon as it writes a response.
    pub fn insert_filter(
        &mut self,
        pattern: &str,
        stage: Stage,
        handler: impl Fn(&mut Context<'_>) + Send + Sync + 'static,
    ) -> &mut Self {
        self.insert_filter_with(pattern, stage, handler, true)
    }

    pub fn insert_filter_with(
        &mut self,
        pattern: &str,
        stage: Stage,
        handler: impl Fn(&mut Context<'_>) + Send + Sync + 'static,
        return_on_output: bool,
    ) -> &mut Self {
        match Pattern::compile_with(pattern, self.config.case_sensitive) {
            Ok(compiled) => {
                info!(pattern, %stage, return_on_output, "filter added");
                self.filters.insert(stage, compiled, handler, return_on_output);
            }
            Err(err) => error!(pattern, %err, "filter dropped"),
        }
        self
    }

    pub fn error_handler(
        &mut self,
        code: impl Into<String>,
        handler: impl Handler + Send + Sync + 'static,
    ) -> &mut Self {
        self.error_handlers.insert(code, handler);
        self
    }

    /// Serves files below `dir` under the URL prefix `prefix`.
    pub fn static_path(&mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> &mut Self {
        self.config.static_paths.push((prefix.into(), dir.into()));
        self
    }

    pub fn renderer(&mut self, renderer: impl Renderer + Send + Sync + 'static) -> &mut Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn build(self) -> App {
        install_panic_hook();
        info!(routes = self.router.len(), "app built");
        App {
            config: self.config,
            router: self.router,
            filters: self.filters,
            error_handlers: self.error_handlers,
            renderer: self.renderer,
        }
    }
}

/// The frozen application. Shared by every connection thread.
pub struct App {
    config: Config,
    router: Router,
    filters: FilterChain,
    error_handlers: ErrorHandlers,
    renderer: Option<Box<dyn Renderer + Send + Sync>>,
}

impl App {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    fn dispatch(&self, w: &mut ResponseWriter, r: &mut Request) {
        let started_at = Instant::now();
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        let Ok(http_method) = HttpMethod::from_str(r.get_http_method()) else {
            info!(method = r.get_http_method(), "method not allowed");
            w.set_reason_phrase(ReasonPhrase::MethodNotAllowed);
            w.add_allow_header(HttpMethod::iter());
            w.set_body_str(ReasonPhrase::MethodNotAllowed.as_str());
            return;
        };

        if !matches!(http_method, HttpMethod::Get | HttpMethod::Head) {
            if let Err(err) = r.parse_form() {
                warn!(%err, "unreadable form body");
            }
        }

        let mut ctx = Context::new(r, w, &self.config);
        if let Some(renderer) = &self.renderer {
            ctx = ctx.with_renderer(renderer.as_ref());
        }

        if self.filters.run(Stage::BeforeStatic, &mut ctx) {
            return;
        }

        if self.config.enable_static {
            let (w, r) = ctx.parts();
            file_server::serve_static(
                &self.config.static_paths,
                self.config.directory_index,
                &self.error_handlers,
                w,
                r,
            );
        }

        if self.filters.run(Stage::BeforeRouter, &mut ctx) {
            return;
        }

        let verb = run_verb(http_method, ctx.request());
        let path = ctx.path().to_owned();
        let Match {
            endpoint,
            action,
            params,
            ..
        } = match self.router.resolve(&path, verb.as_ref()) {
            Lookup::Found(m) => m,
            Lookup::Redirect(location) => {
                if !ctx.is_started() {
                    ctx.redirect(&location, ReasonPhrase::MovedPermanently);
                }
                return;
            }
            Lookup::NotFound => {
                if !ctx.is_started() {
                    let (w, r) = ctx.parts();
                    self.error_handlers.respond("404", w, r);
                }
                return;
            }
        };

        for (name, value) in params {
            ctx.request_mut().set_param(name, value);
        }

        if self.filters.run(Stage::BeforeExec, &mut ctx) {
            return;
        }

        let mut controller = endpoint.instantiate();
        ctx.set_names(endpoint.controller_name(), action.name());
        controller.init(&mut ctx);

        if self.config.enable_xsrf {
            ctx.xsrf_token();
            let unsafe_method = matches!(
                http_method,
                HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete
            );
            if unsafe_method && !ctx.check_xsrf() {
                info!(path = path.as_str(), "xsrf check failed");
                let (w, r) = ctx.parts();
                self.error_handlers.respond("403", w, r);
                return;
            }
        }

        controller.prepare(&mut ctx);
        if !controller.filter(&mut ctx) {
            self.access_log(&mut ctx, started_at, now);
            controller.finish(&mut ctx);
            return;
        }

        if !ctx.is_started() {
            if let Err(abort) = controller.call(action, &mut ctx) {
                if let Abort::Internal(err) = &abort {
                    error!("{:?}", err);
                }
                let (w, r) = ctx.parts();
                self.error_handlers.respond(&abort.code(), w, r);
                return;
            }
        }

        self.access_log(&mut ctx, started_at, now);

        if !ctx.is_started() && self.config.auto_render {
            if let Err(err) = controller.render(&mut ctx) {
                error!("{:?}", err);
            }
        }

        controller.finish(&mut ctx);
        self.filters.run(Stage::AfterExec, &mut ctx);
    }

    fn access_log(&self, ctx: &mut Context<'_>, started_at: Instant, now: u64) {
        if !self.config.access_log {
            return;
        }

        let elapsed = started_at.elapsed();
        ctx.set_data("req_time", format!("{:?}", elapsed));
        ctx.set_data("req_now", now.to_string());

        let r = ctx.request();
        info!(
            target: "access",
            client = %r.get_client_ip().unwrap_or_default(),
            method = r.get_http_method(),
            path = r.get_path(),
            controller = ctx.controller_name(),
            action = ctx.action_name(),
            ?elapsed,
            "access"
        );
    }
}

impl Handler for App {
    fn handle(&self, w: &mut ResponseWriter, r: &mut Request) {
        w.set_header("Server", self.config.server_name.as_str());

        IN_DISPATCH.with(|flag| flag.set(true));
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.dispatch(w, r)));
        IN_DISPATCH.with(|flag| flag.set(false));

        if let Err(payload) = result {
            let message = panic_message(payload.as_ref());
            let backtrace = BACKTRACE
                .with(|bt| bt.borrow_mut().take())
                .unwrap_or_default();
            error!(path = r.get_path(), %message, "request panicked\n{}", backtrace);
            self.error_handlers.respond(&message, w, r);
        }
    }
}

/// The verb a request is routed with: its own method, unless a POST form
/// asks for `put` or `delete` through `_method`.
fn run_verb(http_method: HttpMethod, r: &Request) -> HttpMethod {
    if http_method != HttpMethod::Post {
        return http_method;
    }
    match r.input("_method") {
        Some(m) if m.eq_ignore_ascii_case("put") => HttpMethod::Put,
        Some(m) if m.eq_ignore_ascii_case("delete") => HttpMethod::Delete,
        _ => http_method,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "500".to_owned()
    }
}

thread_local! {
    static IN_DISPATCH: Cell<bool> = const { Cell::new(false) };
    static BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

// Panics inside a dispatch are reported by `App::handle`; the hook only
// captures their backtrace. Panics elsewhere go to the previous hook.
fn install_panic_hook() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_DISPATCH.with(|flag| flag.get()) {
                let backtrace = Backtrace::force_capture().to_string();
                BACKTRACE.with(|bt| *bt.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

#[cfg(test)]
mod tests {
    use std::{io::Write, thread};

    use tempdir::TempDir;

    use crate::{
        config::Config,
        context::Context,
        controller::{Abort, ActionFn, Controller, Outcome},
        filter::Stage,
        render::Data,
        request::Request,
        response_writer::ResponseWriter,
        server::Handler,
        status_code_registry::ReasonPhrase,
        test_utils::{client, read_request, spawn_server},
        xsrf::XsrfStore,
    };

    use super::{App, AppBuilder};

    /// Answers GET with a fixed body.
    struct Tag(&'static str);

    impl Controller for Tag {
        fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
            ctx.write_str(self.0);
            Ok(())
        }
    }

    #[derive(Default)]
    struct Item;

    impl Controller for Item {
        fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
            let id: i64 = ctx
                .get_param("id")
                .unwrap_or_default()
                .parse()
                .map_err(anyhow::Error::from)?;
            ctx.write_str(&format!("item {}", id));
            Ok(())
        }

        fn put(&mut self, ctx: &mut Context<'_>) -> Outcome {
            ctx.write_str("put");
            Ok(())
        }

        fn delete(&mut self, _ctx: &mut Context<'_>) -> Outcome {
            Err(Abort::Status(401))
        }

        fn actions() -> Vec<(&'static str, ActionFn<Self>)> {
            vec![("Teapot", Item::teapot as ActionFn<Self>)]
        }
    }

    impl Item {
        fn teapot(&mut self, _ctx: &mut Context<'_>) -> Outcome {
            Err(Abort::Code("teapot".to_owned()))
        }
    }

    #[derive(Default)]
    struct Boom;

    impl Controller for Boom {
        fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
            match ctx.get_param("code") {
                Some(code) => panic!("{}", code),
                None => panic!("boom"),
            }
        }
    }

    #[derive(Default)]
    struct Page;

    impl Controller for Page {
        fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
            ctx.set_data("name", "world");
            Ok(())
        }

        fn finish(&mut self, ctx: &mut Context<'_>) {
            ctx.response().set_header("X-Finished", "yes");
        }
    }

    #[derive(Default)]
    struct Gate;

    impl Controller for Gate {
        fn filter(&mut self, _ctx: &mut Context<'_>) -> bool {
            false
        }

        fn get(&mut self, ctx: &mut Context<'_>) -> Outcome {
            ctx.write_str("unreachable");
            Ok(())
        }

        fn finish(&mut self, ctx: &mut Context<'_>) {
            ctx.response().set_header("X-Finished", "yes");
        }
    }

    fn quiet_config() -> Config {
        Config {
            enable_static: false,
            ..Config::default()
        }
    }

    fn serve(app: &App, raw: &str) -> ResponseWriter {
        let mut r = read_request(raw);
        let mut w = ResponseWriter::new_empty();
        app.handle(&mut w, &mut r);
        w
    }

    fn get(app: &App, path: &str) -> ResponseWriter {
        serve(app, &format!("GET {} HTTP/1.1\r\n\r\n", path))
    }

    fn post_form(app: &App, path: &str, headers: &str, body: &str) -> ResponseWriter {
        serve(
            app,
            &format!(
                "POST {} HTTP/1.1\r\n\
                 Content-Type: application/x-www-form-urlencoded\r\n\
                 Content-Length: {}\r\n\
                 {}\r\n{}",
                path,
                body.len(),
                headers,
                body
            ),
        )
    }

    fn body(w: &ResponseWriter) -> String {
        String::from_utf8_lossy(w.get_body()).into_owned()
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // routing
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_fixed_route_wins() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route_with("/:x", || Tag("param"), &[])
            .add_route_with("/a", || Tag("fixed"), &[]);
        let app = builder.build();

        assert_eq!(body(&get(&app, "/a")), "fixed");
        assert_eq!(body(&get(&app, "/b")), "param");
    }

    #[test]
    fn test_first_registered_regex_wins() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route_with("/user/:name", || Tag("name"), &[])
            .add_route_with("/user/:id:int", || Tag("id"), &[]);
        let app = builder.build();

        assert_eq!(body(&get(&app, "/user/42")), "name");
    }

    #[test]
    fn test_trailing_slash_redirect() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.add_route_with("/admin/", || Tag("admin"), &[]);
        let app = builder.build();

        let w = get(&app, "/admin");
        assert_eq!(w.get_status_code(), Some(301));
        assert_eq!(w.get_header("location").unwrap(), "/admin/");
        assert_eq!(body(&get(&app, "/admin/")), "admin");
    }

    #[test]
    fn test_route_params() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.add_route::<Item>("/item/:id:int", &[]);
        let app = builder.build();

        assert_eq!(body(&get(&app, "/item/7")), "item 7");
        assert_eq!(body(&get(&app, "/item/7?:id=9")), "item 7");
        assert_eq!(get(&app, "/item/x").get_status_code(), Some(404));
    }

    #[test]
    fn test_route_params_shadow_form() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.add_route::<Item>("/item/:id:int", &["post:Get"]);
        let app = builder.build();

        assert_eq!(body(&post_form(&app, "/item/7", "", "%3Aid=999")), "item 7");
        assert_eq!(body(&post_form(&app, "/item/7?:id=5", "", ":id=999&id=3")), "item 7");
    }

    #[test]
    fn test_not_found_and_bad_routes() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Item>("/broken/:id([0-9]", &[])
            .add_route::<Item>("/mapped", &["brew:Get"])
            .add_route::<Item>("/unknown", &["get:Missing"]);
        let app = builder.build();
        assert!(app.router().is_empty());

        let w = get(&app, "/nope");
        assert_eq!(w.get_status_code(), Some(404));
        assert!(body(&w).contains("Sorry, but this page doesn't exist!"));
        assert_eq!(w.get_header("server").unwrap(), "switchyard");
    }

    #[test]
    fn test_unknown_method() {
        let app = AppBuilder::new(quiet_config()).build();

        let w = serve(&app, "BREW / HTTP/1.1\r\n\r\n");
        assert_eq!(w.get_status_code(), Some(405));
        assert!(w.get_header("allow").unwrap().contains("GET"));
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // method resolution
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_method_override() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.add_route::<Item>("/item", &[]);
        let app = builder.build();

        assert_eq!(body(&post_form(&app, "/item", "", "_method=put")), "put");
        assert_eq!(post_form(&app, "/item", "", "_method=delete").get_status_code(), Some(401));

        let w = post_form(&app, "/item", "", "a=b");
        assert_eq!(w.get_status_code(), Some(405));
    }

    #[test]
    fn test_method_mappings() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Item>("/only-put", &["put:Put"])
            .add_route::<Item>("/any", &["*:Put"])
            .add_route::<Item>("/teapot", &["get:Teapot"])
            .error_handler("teapot", |w: &mut ResponseWriter, _: &mut Request| {
                w.set_body_str("short and stout");
            });
        let app = builder.build();

        assert_eq!(get(&app, "/only-put").get_status_code(), Some(404));
        assert_eq!(body(&get(&app, "/any")), "put");

        let w = get(&app, "/teapot");
        assert_eq!(w.get_status_code(), Some(500));
        assert_eq!(body(&w), "short and stout");
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // filters and hooks
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_filter_short_circuit() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route_with("/admin/users", || Tag("users"), &[])
            .insert_filter("/admin/*", Stage::BeforeRouter, |ctx| {
                ctx.response().set_reason_phrase(ReasonPhrase::Forbidden);
                ctx.write_str("denied");
            })
            .insert_filter("/admin/*", Stage::AfterExec, |ctx| ctx.write_str("|after"));
        let app = builder.build();

        let w = get(&app, "/admin/users");
        assert_eq!(w.get_status_code(), Some(403));
        assert_eq!(body(&w), "denied");
    }

    #[test]
    fn test_catch_all_filter() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route_with("/x", || Tag("handler"), &[])
            .insert_filter("*", Stage::BeforeRouter, |ctx| ctx.write_str("filtered"));
        let app = builder.build();

        for path in ["/x", "/", "/a/b"] {
            assert_eq!(body(&get(&app, path)), "filtered");
        }
    }

    #[test]
    fn test_filter_fire_and_continue() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route_with("/admin/users", || Tag("users"), &[])
            .insert_filter_with("/admin/*", Stage::BeforeRouter, |ctx| ctx.write_str("seen"), false)
            .insert_filter("/admin/*", Stage::AfterExec, |ctx| ctx.write_str("|after"));
        let app = builder.build();

        // The action is skipped because the response has started.
        assert_eq!(body(&get(&app, "/admin/users")), "seen|after");
    }

    #[test]
    fn test_before_exec_sees_params() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Item>("/item/:id:int", &[])
            .insert_filter("/item/*", Stage::BeforeExec, |ctx| {
                let id = ctx.get_param("id").unwrap_or_default().to_owned();
                ctx.write_str(&format!("filtered {}", id));
            });
        let app = builder.build();

        assert_eq!(body(&get(&app, "/item/3")), "filtered 3");
    }

    #[test]
    fn test_controller_filter_false() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Gate>("/gate", &[])
            .insert_filter("/gate", Stage::AfterExec, |ctx| ctx.write_str("after"));
        let app = builder.build();

        let w = get(&app, "/gate");
        assert_eq!(body(&w), "");
        assert_eq!(w.get_header("x-finished").unwrap(), "yes");
    }

    #[test]
    fn test_auto_render() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Page>("/page", &[])
            .renderer(|template: &str, data: &Data| -> anyhow::Result<Vec<u8>> {
                let name = data.get("name").cloned().unwrap_or_default();
                let took = data.contains_key("req_time");
                Ok(format!("{} {} {}", template, name, took).into_bytes())
            });
        let app = builder.build();

        let w = get(&app, "/page");
        assert_eq!(body(&w), "page/get.html world true");
        assert_eq!(w.get_content_type_header().unwrap(), "text/html; charset=utf-8");
        assert_eq!(w.get_header("x-finished").unwrap(), "yes");
    }

    #[test]
    fn test_render_failure_still_finishes() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Page>("/page", &[])
            .insert_filter("/page", Stage::AfterExec, |ctx| ctx.write_str("after"))
            .renderer(|template: &str, _: &Data| -> anyhow::Result<Vec<u8>> {
                Err(anyhow::anyhow!("no template {}", template))
            });
        let app = builder.build();

        let w = get(&app, "/page");
        assert_eq!(body(&w), "after");
        assert_eq!(w.get_header("x-finished").unwrap(), "yes");
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // errors
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_panic_becomes_error_page() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Boom>("/boom", &[])
            .add_route::<Boom>("/boom/:code", &[]);
        let app = builder.build();

        let w = get(&app, "/boom");
        assert_eq!(w.get_status_code(), Some(500));
        assert!(body(&w).contains("Sorry, internal server error!"));

        let w = get(&app, "/boom/404");
        assert_eq!(w.get_status_code(), Some(404));
        assert_eq!(w.get_header("server").unwrap(), "switchyard");
    }

    #[test]
    fn test_custom_error_handler() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.error_handler("404", |w: &mut ResponseWriter, r: &mut Request| {
            let path = r.get_path().to_owned();
            w.set_body_str(&format!("no {}", path));
        });
        let app = builder.build();

        let w = get(&app, "/missing");
        assert_eq!(w.get_status_code(), Some(404));
        assert_eq!(body(&w), "no /missing");
    }

    #[test]
    fn test_xsrf() {
        let config = Config {
            enable_xsrf: true,
            xsrf_key: "secret".to_owned(),
            ..quiet_config()
        };
        let mut builder = AppBuilder::new(config);
        builder.add_route::<Item>("/item", &[]);
        let app = builder.build();

        let w = post_form(&app, "/item", "", "_method=put");
        assert_eq!(w.get_status_code(), Some(403));

        let cookie = XsrfStore::new("secret", 0).cookie("token123").header_value();
        let cookie = cookie.split(';').next().unwrap();
        let headers = format!("Cookie: {}\r\n", cookie);

        let w = post_form(&app, "/item", &headers, "_method=put&_xsrf=wrong");
        assert_eq!(w.get_status_code(), Some(403));

        let w = post_form(&app, "/item", &headers, "_method=put&_xsrf=token123");
        assert_eq!(body(&w), "put");

        let headers = format!("{}X-Csrftoken: token123\r\n", headers);
        let w = post_form(&app, "/item", &headers, "_method=put");
        assert_eq!(body(&w), "put");
    }

    #[test]
    fn test_xsrf_cookie_issued_on_get() {
        let config = Config {
            enable_xsrf: true,
            ..quiet_config()
        };
        let mut builder = AppBuilder::new(config);
        builder.add_route_with("/", || Tag("home"), &[]);
        let app = builder.build();

        let w = get(&app, "/");
        assert_eq!(body(&w), "home");
        assert!(w.get_header("set-cookie").unwrap().starts_with("_xsrf="));
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // static files
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_static_files() {
        let tmp_dir = TempDir::new("assets").unwrap();
        let mut file = std::fs::File::create(tmp_dir.path().join("hello.txt")).unwrap();
        write!(file, "hello from disk").unwrap();

        let config = Config {
            static_paths: vec![],
            ..Config::default()
        };
        let mut builder = AppBuilder::new(config);
        builder
            .static_path("/assets", tmp_dir.path())
            .add_route_with("/assets/hello.txt", || Tag("route"), &[]);
        let app = builder.build();

        let w = get(&app, "/assets/hello.txt");
        assert_eq!(w.get_status_code(), Some(200));
        assert_eq!(body(&w), "hello from disk");

        let w = get(&app, "/assets/missing.txt");
        assert_eq!(w.get_status_code(), Some(404));
        assert_eq!(body(&w), "404 page not found");

        let w = get(&app, "/assets/");
        assert_eq!(w.get_status_code(), Some(403));
    }

    #[test]
    fn test_static_miss_not_redirected() {
        let tmp_dir = TempDir::new("assets").unwrap();

        let mut builder = AppBuilder::new(Config::default());
        builder
            .static_path("/assets", tmp_dir.path())
            .add_route_with("/assets/x/", || Tag("route"), &[]);
        let app = builder.build();

        let w = get(&app, "/assets/x");
        assert_eq!(w.get_status_code(), Some(404));
        assert!(w.get_header("location").is_none());
        assert_eq!(body(&w), "404 page not found");
    }

    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -
    // over the wire
    // - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - - -

    #[test]
    fn test_panic_isolation() {
        let mut builder = AppBuilder::new(quiet_config());
        builder
            .add_route::<Boom>("/boom", &[])
            .add_route_with("/ok", || Tag("ok"), &[]);
        let addr = spawn_server(builder.build());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                thread::spawn(move || {
                    let path = if i % 2 == 0 { "/boom" } else { "/ok" };
                    let resp = client().get(format!("http://{}{}", addr, path)).send().unwrap();
                    (path, resp.status().as_u16(), resp.text().unwrap())
                })
            })
            .collect();

        for handle in handles {
            match handle.join().unwrap() {
                ("/ok", status, text) => assert_eq!((status, text.as_str()), (200, "ok")),
                (_, status, _) => assert_eq!(status, 500),
            }
        }
    }

    #[test]
    fn test_redirect_over_the_wire() {
        let mut builder = AppBuilder::new(quiet_config());
        builder.add_route_with("/docs/", || Tag("docs"), &[]);
        let addr = spawn_server(builder.build());

        let resp = client().get(format!("http://{}/docs", addr)).send().unwrap();
        assert_eq!(resp.status(), 301);
        assert_eq!(resp.headers().get("location").unwrap(), "/docs/");
        assert_eq!(resp.headers().get("server").unwrap(), "switchyard");
    }
}
