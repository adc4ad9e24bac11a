//! Root orchestration: prefetching, prerendering and mounting an application.
//!
//! The server side calls [`App::prerender`]: every binding records what the tree
//! fetches while it is prepared, the recorded data is then injected back and the
//! tree is rendered with everything available synchronously. The client side
//! calls [`App::mount`] with that same data, so its first render matches.
//!
//! Binding sessions and the current nexus are released on every exit path,
//! including failures and dropped futures.

use core::fmt::{self, Debug};

use preparable_core::{Context, Node, Preparer, StatsSnapshot};

use crate::nexus::{InjectionSession, PrefetchSession};
use crate::{Error, Nexus, NexusScope, PrefetchedData, WithNexus, current_nexus, with_nexus};

/// What a [`Renderer`] is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderMode {
    /// Markup a client can later attach to.
    Markup,
    /// Markup that is never attached to.
    StaticMarkup,
    /// A live tree on the client.
    Mount,
}

/// Turns a prepared tree into output.
pub trait Renderer {
    /// What rendering produces.
    type Output;

    /// Renders `root`.
    ///
    /// # Errors
    ///
    /// Any failure of the underlying renderer.
    fn render(&mut self, root: &Node, mode: RenderMode) -> anyhow::Result<Self::Output>;
}

impl<F, O> Renderer for F
where
    F: FnMut(&Node, RenderMode) -> anyhow::Result<O>,
{
    type Output = O;

    fn render(&mut self, root: &Node, mode: RenderMode) -> anyhow::Result<O> {
        self(root, mode)
    }
}

/// Output of a prerender together with the data it was rendered from.
#[derive(Debug, Clone)]
pub struct Prerendered<O> {
    /// What the renderer produced.
    pub output: O,
    /// Data the client needs to mount the same tree.
    pub data: PrefetchedData,
}

/// A root node bound to a nexus.
///
/// Clones share the root and the bindings but count their passes separately.
pub struct App {
    root: Node,
    nexus: Nexus,
    context: Context,
    preparer: Preparer,
}

impl App {
    /// Creates an application with a default [`Preparer`] and an empty root context.
    pub fn new(root: impl Into<Node>, nexus: Nexus) -> Self {
        Self {
            root: root.into(),
            nexus,
            context: Context::new(),
            preparer: Preparer::new(),
        }
    }

    /// Replaces the root context.
    #[must_use]
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Replaces the preparer, for example with [`Config::preparer`](crate::Config::preparer).
    #[must_use]
    pub fn with_preparer(mut self, preparer: Preparer) -> Self {
        self.preparer = preparer;
        self
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> &Node {
        &self.root
    }

    /// The bindings of this application.
    #[must_use]
    pub const fn nexus(&self) -> &Nexus {
        &self.nexus
    }

    /// Counts of the last preparation pass.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.preparer.stats().snapshot()
    }

    /// Prepares the tree while every binding records, and returns what they
    /// recorded.
    ///
    /// # Errors
    ///
    /// Fails if preparation fails. Recording is stopped and its data discarded.
    pub async fn prefetch(&self) -> Result<PrefetchedData, Error> {
        let session = PrefetchSession::start(&self.nexus);
        let context = self.nexus.attach(&self.context);
        let step = with_nexus(&self.nexus, || self.preparer.prepare(&self.root, &context))?;
        WithNexus::new(self.nexus.clone(), step.into_future()).await?;

        let data = session.finish();
        tracing::debug!(bindings = data.len(), "prefetched");
        Ok(data)
    }

    /// Prefetches, then renders with the recorded data injected.
    ///
    /// # Errors
    ///
    /// Fails if preparation or rendering fails.
    pub async fn prerender<R: Renderer>(
        &self,
        renderer: &mut R,
    ) -> Result<Prerendered<R::Output>, Error> {
        self.prerender_as(renderer, RenderMode::Markup).await
    }

    /// Like [`prerender`](Self::prerender), producing static markup.
    ///
    /// # Errors
    ///
    /// Fails if preparation or rendering fails.
    pub async fn prerender_static<R: Renderer>(
        &self,
        renderer: &mut R,
    ) -> Result<Prerendered<R::Output>, Error> {
        self.prerender_as(renderer, RenderMode::StaticMarkup).await
    }

    async fn prerender_as<R: Renderer>(
        &self,
        renderer: &mut R,
        mode: RenderMode,
    ) -> Result<Prerendered<R::Output>, Error> {
        let data = self.prefetch().await?;
        let output = {
            let _injection = InjectionSession::start(&self.nexus, &data)?;
            with_nexus(&self.nexus, || renderer.render(&self.root, mode)).map_err(Error::Render)?
        };
        tracing::debug!(?mode, "prerendered");
        Ok(Prerendered { output, data })
    }

    /// Renders the tree on the client with `data` injected, keeping the nexus
    /// installed as the current one until the returned handle is unmounted.
    ///
    /// # Errors
    ///
    /// Fails if a nexus is already mounted on this thread, if `data` lacks an
    /// entry for one of the bindings, or if rendering fails. Nothing stays
    /// installed on failure.
    pub fn mount<R: Renderer>(
        &self,
        data: &PrefetchedData,
        renderer: &mut R,
    ) -> Result<MountHandle<R::Output>, Error> {
        if current_nexus().is_some() {
            return Err(Error::NexusAlreadyMounted);
        }
        let scope = NexusScope::enter(self.nexus.clone());
        let output = {
            let _injection = InjectionSession::start(&self.nexus, data)?;
            renderer
                .render(&self.root, RenderMode::Mount)
                .map_err(Error::Render)?
        };
        tracing::debug!(bindings = self.nexus.len(), "mounted");
        Ok(MountHandle { output, scope })
    }
}

impl Clone for App {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            nexus: self.nexus.clone(),
            context: self.context.clone(),
            preparer: self.preparer.detached(),
        }
    }
}

impl Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("nexus", &self.nexus)
            .field("options", self.preparer.options())
            .finish_non_exhaustive()
    }
}

/// A mounted application. Dropping it uninstalls its nexus.
#[derive(Debug)]
#[must_use = "the application is unmounted as soon as the handle is dropped"]
pub struct MountHandle<O> {
    output: O,
    scope: NexusScope,
}

impl<O> MountHandle<O> {
    /// What the renderer produced.
    pub const fn output(&self) -> &O {
        &self.output
    }

    /// Mutable access to the renderer's output.
    pub const fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Uninstalls the nexus and returns the renderer's output.
    pub fn unmount(self) -> O {
        let Self { output, scope } = self;
        drop(scope);
        tracing::debug!("unmounted");
        output
    }
}

/// [`App::prefetch`] for a one-off root.
///
/// # Errors
///
/// See [`App::prefetch`].
pub async fn prefetch(root: &Node, nexus: &Nexus) -> Result<PrefetchedData, Error> {
    App::new(root.clone(), nexus.clone()).prefetch().await
}

/// [`App::prerender`] for a one-off root.
///
/// # Errors
///
/// See [`App::prerender`].
pub async fn prerender<R: Renderer>(
    root: &Node,
    nexus: &Nexus,
    renderer: &mut R,
) -> Result<Prerendered<R::Output>, Error> {
    App::new(root.clone(), nexus.clone())
        .prerender(renderer)
        .await
}

/// [`App::prerender_static`] for a one-off root.
///
/// # Errors
///
/// See [`App::prerender_static`].
pub async fn prerender_static<R: Renderer>(
    root: &Node,
    nexus: &Nexus,
    renderer: &mut R,
) -> Result<Prerendered<R::Output>, Error> {
    App::new(root.clone(), nexus.clone())
        .prerender_static(renderer)
        .await
}

/// [`App::mount`] for a one-off root.
///
/// # Errors
///
/// See [`App::mount`].
pub fn mount<R: Renderer>(
    root: &Node,
    nexus: &Nexus,
    data: &PrefetchedData,
    renderer: &mut R,
) -> Result<MountHandle<R::Output>, Error> {
    App::new(root.clone(), nexus.clone()).mount(data, renderer)
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use anyhow::anyhow;
    use futures::executor::block_on;
    use indexmap::IndexMap;
    use preparable_core::{
        Component, CompositeType, PendingDependency, PrepareError, Props, with_dependency,
    };
    use serde_json::{Value, json};

    use super::*;

    type Events = Rc<RefCell<Vec<String>>>;

    #[derive(Default)]
    struct UserStore {
        events: Events,
        recording: Cell<bool>,
        fetched: RefCell<IndexMap<String, Value>>,
        injected: RefCell<Option<Value>>,
    }

    impl UserStore {
        fn log(&self, event: impl Into<String>) {
            self.events.borrow_mut().push(event.into());
        }
    }

    impl crate::Binding for UserStore {
        fn start_prefetching(&self) {
            self.log("start_prefetching");
            self.recording.set(true);
        }

        fn stop_prefetching(&self) -> Value {
            self.log("stop_prefetching");
            self.recording.set(false);
            Value::Object(self.fetched.borrow_mut().drain(..).collect())
        }

        fn start_injecting(&self, data: Value) {
            self.log(format!("start_injecting {data}"));
            *self.injected.borrow_mut() = Some(data);
        }

        fn stop_injecting(&self) {
            self.log("stop_injecting");
            self.injected.borrow_mut().take();
        }
    }

    struct Card;

    impl Component for Card {
        fn create(_: &Props, _: &Context) -> anyhow::Result<Self> {
            Ok(Self)
        }

        fn render(&mut self) -> anyhow::Result<Node> {
            Ok(Node::Empty)
        }
    }

    fn card(store: &Rc<UserStore>) -> CompositeType {
        let store = store.clone();
        with_dependency(move |props, context| {
            assert!(Nexus::from_context(context).is_some());
            let id = props.get_str("id").unwrap_or_default().to_owned();
            store.log(format!("fetch {id}"));
            let store = store.clone();
            Ok(PendingDependency::deferred(async move {
                assert!(current_nexus().is_some());
                if id == "broken" {
                    return Err(anyhow!("user service unavailable"));
                }
                if store.recording.get() {
                    store
                        .fetched
                        .borrow_mut()
                        .insert(id.clone(), json!(format!("user {id}")));
                }
                Ok(())
            }))
        })(CompositeType::of::<Card>())
    }

    fn setup(ids: &[&str]) -> (App, Rc<UserStore>) {
        let store = Rc::new(UserStore::default());
        let ty = card(&store);
        let root = Node::host("main")
            .children(ids.iter().map(|id| Node::composite(ty.clone()).prop("id", *id).build()))
            .build();
        let mut nexus = Nexus::new();
        nexus.insert("users", store.clone());
        (App::new(root, nexus), store)
    }

    fn renderer(store: &Rc<UserStore>) -> impl FnMut(&Node, RenderMode) -> anyhow::Result<String> {
        let store = store.clone();
        move |_, mode| {
            assert!(current_nexus().is_some_and(|nexus| nexus.contains("users")));
            store.log(format!("render {mode:?}"));
            let injected = store.injected.borrow().clone().unwrap_or_default();
            Ok(format!("<main data-users='{injected}'></main>"))
        }
    }

    fn events(store: &UserStore) -> Vec<String> {
        store.events.borrow().clone()
    }

    #[test]
    fn prerender_records_then_injects_then_renders() {
        let (app, store) = setup(&["1", "2"]);
        let prerendered = block_on(app.prerender(&mut renderer(&store))).unwrap();

        let users = json!({ "1": "user 1", "2": "user 2" });
        assert_eq!(prerendered.data.get("users"), Some(&users));
        assert_eq!(
            prerendered.output,
            format!("<main data-users='{users}'></main>")
        );
        assert_eq!(
            events(&store),
            [
                "start_prefetching".to_owned(),
                "fetch 1".to_owned(),
                "fetch 2".to_owned(),
                "stop_prefetching".to_owned(),
                format!("start_injecting {users}"),
                "render Markup".to_owned(),
                "stop_injecting".to_owned(),
            ]
        );
        assert_eq!(app.stats().asynchronous, 2);
        assert!(current_nexus().is_none());
    }

    #[test]
    fn static_prerender_uses_the_static_mode() {
        let (app, store) = setup(&["1"]);
        block_on(app.prerender_static(&mut renderer(&store))).unwrap();
        assert!(events(&store).contains(&"render StaticMarkup".to_owned()));
    }

    #[test]
    fn failed_prefetch_stops_recording_and_clears_the_scope() {
        let (app, store) = setup(&["1", "broken"]);
        let error = block_on(app.prerender(&mut renderer(&store))).unwrap_err();

        assert!(matches!(
            error.as_prepare(),
            Some(PrepareError::Dependency { component, .. }) if component == "Preparable(Card)"
        ));
        assert_eq!(events(&store).last().unwrap(), "stop_prefetching");
        assert!(!events(&store).iter().any(|event| event.starts_with("render")));
        assert!(!store.recording.get());
        assert!(current_nexus().is_none());
    }

    #[test]
    fn failed_render_stops_injecting() {
        let (app, store) = setup(&["1"]);
        let mut failing = |_: &Node, _: RenderMode| -> anyhow::Result<String> {
            Err(anyhow!("template missing"))
        };

        let error = block_on(app.prerender(&mut failing)).unwrap_err();
        assert!(matches!(error, Error::Render(_)));
        assert_eq!(events(&store).last().unwrap(), "stop_injecting");
        assert!(store.injected.borrow().is_none());
        assert!(current_nexus().is_none());
    }

    #[test]
    fn mount_keeps_the_nexus_until_unmounted() {
        let (server, server_store) = setup(&["1"]);
        let payload = serde_json::to_string(
            &block_on(server.prerender(&mut renderer(&server_store)))
                .unwrap()
                .data,
        )
        .unwrap();

        let (client, client_store) = setup(&["1"]);
        let data: PrefetchedData = serde_json::from_str(&payload).unwrap();
        let handle = client.mount(&data, &mut renderer(&client_store)).unwrap();

        assert!(handle.output().contains("user 1"));
        assert!(current_nexus().is_some());
        assert_eq!(
            events(&client_store),
            [
                r#"start_injecting {"1":"user 1"}"#,
                "render Mount",
                "stop_injecting"
            ]
        );

        let second = client.mount(&data, &mut renderer(&client_store));
        assert!(matches!(second, Err(Error::NexusAlreadyMounted)));

        let output = handle.unmount();
        assert!(output.starts_with("<main"));
        assert!(current_nexus().is_none());
    }

    #[test]
    fn mount_without_data_leaves_nothing_installed() {
        let (app, store) = setup(&["1"]);
        let error = app
            .mount(&PrefetchedData::new(), &mut renderer(&store))
            .unwrap_err();

        assert!(matches!(error, Error::MissingPrefetchedData { ref binding } if binding == "users"));
        assert!(events(&store).is_empty());
        assert!(current_nexus().is_none());
    }

    #[test]
    fn dropping_the_handle_unmounts() {
        let (app, store) = setup(&[]);
        let mut data = PrefetchedData::new();
        data.insert("users", json!({}));

        drop(app.mount(&data, &mut renderer(&store)).unwrap());
        assert!(current_nexus().is_none());
    }

    #[test]
    fn cloned_apps_keep_separate_counts() {
        let (app, _store) = setup(&["1", "2"]);
        let copy = app.clone();

        block_on(app.prefetch()).unwrap();
        assert_eq!(app.stats().asynchronous, 2);
        assert_eq!(copy.stats().asynchronous, 0);

        block_on(copy.prefetch()).unwrap();
        assert_eq!(copy.stats().asynchronous, 2);
    }

    #[test]
    fn free_functions_drive_a_one_off_root() {
        let (app, store) = setup(&["7"]);
        let data = block_on(prefetch(app.root(), app.nexus())).unwrap();
        assert_eq!(data.get("users"), Some(&json!({ "7": "user 7" })));

        let handle = mount(app.root(), app.nexus(), &data, &mut renderer(&store)).unwrap();
        assert!(handle.output().contains("user 7"));
    }
}
