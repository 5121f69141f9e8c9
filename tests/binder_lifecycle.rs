// 查看器生命周期：挂载 / 更新 / 卸载 与后台尺寸加载的交互
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use attachment_lightbox::lightbox::{
    DestroyObserver, DestroyObservers, EngineFactory, EngineOptions, LightboxConfig,
    LightboxError, LightboxProps, NoThumbnails, Phase, PresentationEngine, RawImageItem, Size,
    SizeCallback, SizeLoader, SlideHandle, ThumbnailInfo, ThumbnailLookup, ViewerBinder,
};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Init,
    LoadAndOpen { index: usize, sizes: Vec<(f64, f64)> },
    GoTo(usize),
    Refresh(usize),
    UpdateSize(bool),
    OnDestroy,
    OffDestroy,
    Destroy,
}

#[derive(Default)]
struct Journal {
    calls: Mutex<Vec<Call>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

impl Journal {
    fn record(&self, call: Call) {
        self.calls.lock().expect("journal lock").push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("journal lock").clone()
    }

    fn clear(&self) {
        self.calls.lock().expect("journal lock").clear();
    }
}

struct RecordingEngine {
    journal: Arc<Journal>,
    current: Option<usize>,
    observers: DestroyObservers,
}

impl PresentationEngine for RecordingEngine {
    fn init(&mut self) -> Result<(), LightboxError> {
        self.journal.record(Call::Init);
        Ok(())
    }

    fn load_and_open(&mut self, index: usize, slides: Vec<SlideHandle>) {
        let sizes = slides
            .iter()
            .map(|slide| {
                let size = slide.size();
                (size.width, size.height)
            })
            .collect();
        self.current = Some(index);
        self.journal.record(Call::LoadAndOpen { index, sizes });
    }

    fn go_to(&mut self, index: usize) {
        self.current = Some(index);
        self.journal.record(Call::GoTo(index));
    }

    fn current_index(&self) -> Option<usize> {
        self.current
    }

    fn refresh_slide_content(&mut self, index: usize) {
        self.journal.record(Call::Refresh(index));
    }

    fn update_size(&mut self, force: bool) {
        self.journal.record(Call::UpdateSize(force));
    }

    fn on_destroy(&mut self, observer: DestroyObserver) {
        self.observers.add(observer);
        self.journal.record(Call::OnDestroy);
    }

    fn off_destroy(&mut self, observer: &DestroyObserver) {
        self.observers.remove(observer);
        self.journal.record(Call::OffDestroy);
    }

    fn destroy(&mut self) {
        self.journal.destroyed.fetch_add(1, Ordering::SeqCst);
        self.journal.record(Call::Destroy);
        self.observers.notify();
    }
}

fn recording_factory(journal: &Arc<Journal>) -> Arc<dyn EngineFactory> {
    let journal = Arc::clone(journal);
    Arc::new(move |_: &EngineOptions| {
        journal.created.fetch_add(1, Ordering::SeqCst);
        Ok::<_, LightboxError>(Box::new(RecordingEngine {
            journal: Arc::clone(&journal),
            current: None,
            observers: DestroyObservers::default(),
        }) as Box<dyn PresentationEngine>)
    })
}

/// 把加载请求攒起来，由测试决定何时完成。
#[derive(Default)]
struct ManualLoader {
    requests: Mutex<Vec<(String, SizeCallback)>>,
}

impl ManualLoader {
    fn sources(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("loader lock")
            .iter()
            .map(|(src, _)| src.clone())
            .collect()
    }

    fn complete_all(&self, size: Size) {
        let requests = std::mem::take(&mut *self.requests.lock().expect("loader lock"));
        for (_, on_loaded) in requests {
            on_loaded(size);
        }
    }
}

impl SizeLoader for ManualLoader {
    fn load(&self, src: String, on_loaded: SizeCallback) {
        self.requests.lock().expect("loader lock").push((src, on_loaded));
    }
}

struct Harness {
    journal: Arc<Journal>,
    loader: Arc<ManualLoader>,
    binder: ViewerBinder,
}

fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let journal = Arc::new(Journal::default());
    let loader = Arc::new(ManualLoader::default());
    let binder = ViewerBinder::new(
        recording_factory(&journal),
        Arc::clone(&loader) as Arc<dyn SizeLoader>,
        LightboxConfig::default(),
    );
    Harness {
        journal,
        loader,
        binder,
    }
}

fn mixed_items() -> Vec<RawImageItem> {
    vec![
        RawImageItem::new("a.jpg"),
        RawImageItem::new("b.jpg").with_size(100.0, 50.0),
    ]
}

fn props(items: Vec<RawImageItem>) -> LightboxProps {
    LightboxProps::new(items, Arc::new(NoThumbnails))
}

#[test]
fn mount_then_unmount_creates_and_destroys_one_engine() {
    let mut h = harness();

    h.binder.mount(&props(mixed_items())).expect("mount");
    h.binder.unmount();

    assert_eq!(h.journal.created.load(Ordering::SeqCst), 1);
    assert_eq!(h.journal.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(h.binder.phase(), Phase::Destroyed);
    assert!(!h.binder.has_engine());
}

#[test]
fn mixed_items_open_at_first_slide_with_pending_load() {
    let mut h = harness();

    h.binder.mount(&props(mixed_items())).expect("mount");

    assert_eq!(
        h.journal.calls(),
        vec![
            Call::Init,
            Call::LoadAndOpen {
                index: 0,
                sizes: vec![(1.0, 1.0), (100.0, 50.0)],
            },
        ]
    );
    assert_eq!(h.loader.sources(), vec!["a.jpg".to_string()]);
}

#[test]
fn completed_load_corrects_size_and_refreshes_current_slide() {
    let mut h = harness();
    h.binder.mount(&props(mixed_items())).expect("mount");
    h.journal.clear();

    h.loader.complete_all(Size::new(640.0, 480.0));

    assert_eq!(h.binder.slides()[0].size(), Size::new(640.0, 480.0));
    assert_eq!(h.binder.slides()[1].size(), Size::new(100.0, 50.0));
    assert_eq!(h.journal.calls(), vec![Call::Refresh(0), Call::UpdateSize(true)]);
}

#[test]
fn mount_opens_at_start_index() {
    let mut h = harness();
    let mut current = props(mixed_items());
    current.index = 1;

    h.binder.mount(&current).expect("mount");
    h.binder.update(&current);

    assert_eq!(
        h.journal.calls(),
        vec![
            Call::Init,
            Call::LoadAndOpen {
                index: 1,
                sizes: vec![(1.0, 1.0), (100.0, 50.0)],
            },
        ]
    );
}

#[test]
fn correction_off_screen_refreshes_corrected_then_current_slide() {
    let mut h = harness();
    let items = vec![
        RawImageItem::new("a.jpg").with_size(100.0, 50.0),
        RawImageItem::new("b.jpg"),
    ];
    h.binder.mount(&props(items)).expect("mount");
    h.journal.clear();

    h.loader.complete_all(Size::new(640.0, 480.0));

    assert_eq!(h.binder.slides()[1].size(), Size::new(640.0, 480.0));
    assert_eq!(
        h.journal.calls(),
        vec![Call::Refresh(1), Call::Refresh(0), Call::UpdateSize(true)]
    );
}

#[test]
fn index_change_navigates_without_reload() {
    let mut h = harness();
    let mut current = props(mixed_items());
    h.binder.mount(&current).expect("mount");
    h.journal.clear();

    current.index = 1;
    h.binder.update(&current);

    assert_eq!(h.journal.calls(), vec![Call::GoTo(1)]);
    assert_eq!(h.loader.sources().len(), 1);
}

#[test]
fn new_items_with_new_index_only_reopen() {
    let mut h = harness();
    let current = props(mixed_items());
    h.binder.mount(&current).expect("mount");
    h.journal.clear();

    let mut next = props(vec![RawImageItem::new("c.jpg").with_size(30.0, 20.0)]);
    next.index = 1;
    h.binder.update(&next);

    assert_eq!(
        h.journal.calls(),
        vec![Call::LoadAndOpen {
            index: 0,
            sizes: vec![(30.0, 20.0)],
        }]
    );
}

#[test]
fn same_props_update_is_a_no_op() {
    let mut h = harness();
    let current = props(mixed_items());
    h.binder.mount(&current).expect("mount");
    h.journal.clear();

    h.binder.update(&current.clone());

    assert!(h.journal.calls().is_empty());
}

#[test]
fn thumbnail_lookup_change_renormalizes() {
    let mut h = harness();
    let mut current = props(vec![RawImageItem::new("a.jpg")]);
    h.binder.mount(&current).expect("mount");
    h.journal.clear();

    let lookup: Arc<dyn ThumbnailLookup> = Arc::new(|_: usize| {
        Some(ThumbnailInfo {
            current_src: Some("thumb-a.jpg".to_string()),
            rendered_width: 200.0,
            rendered_height: 100.0,
        })
    });
    current.thumbnails = lookup;
    h.binder.update(&current);

    assert_eq!(
        h.journal.calls(),
        vec![Call::LoadAndOpen {
            index: 0,
            sizes: vec![(800.0, 400.0)],
        }]
    );
    assert_eq!(h.binder.slides()[0].snapshot().msrc.as_deref(), Some("thumb-a.jpg"));
}

#[test]
fn observer_swap_unregisters_old_before_registering_new() {
    let mut h = harness();
    let old_calls = Arc::new(AtomicUsize::new(0));
    let new_calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&old_calls);
    let mut current = props(mixed_items());
    current.on_destroy = Some(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    h.binder.mount(&current).expect("mount");
    h.journal.clear();

    let counter = Arc::clone(&new_calls);
    current.on_destroy = Some(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    h.binder.update(&current);
    h.binder.unmount();

    assert_eq!(
        h.journal.calls(),
        vec![Call::OffDestroy, Call::OnDestroy, Call::Destroy]
    );
    assert_eq!(old_calls.load(Ordering::SeqCst), 0);
    assert_eq!(new_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn late_load_after_unmount_is_ignored() {
    let mut h = harness();
    h.binder.mount(&props(mixed_items())).expect("mount");
    let slides = h.binder.slides().to_vec();
    h.binder.unmount();
    h.journal.clear();

    h.loader.complete_all(Size::new(640.0, 480.0));

    assert!(h.journal.calls().is_empty());
    assert_eq!(slides[0].size(), Size::new(1.0, 1.0));
}

#[test]
fn late_load_after_binder_dropped_is_ignored() {
    let h = harness();
    let Harness {
        journal,
        loader,
        mut binder,
    } = h;
    binder.mount(&props(mixed_items())).expect("mount");
    drop(binder);

    assert_eq!(journal.destroyed.load(Ordering::SeqCst), 1);
    journal.clear();

    loader.complete_all(Size::new(640.0, 480.0));
    assert!(journal.calls().is_empty());
}

#[test]
fn unmount_is_idempotent_and_blocks_remount() {
    let mut h = harness();
    h.binder.mount(&props(mixed_items())).expect("mount");

    h.binder.unmount();
    h.binder.unmount();
    h.binder.mount(&props(mixed_items())).expect("mount after destroy");

    assert_eq!(h.journal.created.load(Ordering::SeqCst), 1);
    assert_eq!(h.journal.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(h.binder.phase(), Phase::Destroyed);
}

#[test]
fn unmount_before_mount_creates_nothing() {
    let mut h = harness();

    h.binder.unmount();

    assert_eq!(h.journal.created.load(Ordering::SeqCst), 0);
    assert_eq!(h.binder.phase(), Phase::Destroyed);
}

#[test]
fn construction_failure_leaves_binder_uninitialized() {
    let loader: Arc<dyn SizeLoader> = Arc::new(ManualLoader::default());
    let factory: Arc<dyn EngineFactory> = Arc::new(|_: &EngineOptions| {
        Err::<Box<dyn PresentationEngine>, _>(LightboxError::EngineConstruction(
            "missing presentation module".to_string(),
        ))
    });
    let mut binder = ViewerBinder::new(factory, loader, LightboxConfig::default());

    let result = binder.mount(&props(mixed_items()));

    assert!(matches!(result, Err(LightboxError::EngineConstruction(_))));
    assert_eq!(binder.phase(), Phase::Uninitialized);
    assert!(!binder.has_engine());
}

#[test]
fn updates_before_mount_are_ignored() {
    let mut h = harness();

    h.binder.update(&props(mixed_items()));

    assert_eq!(h.journal.created.load(Ordering::SeqCst), 0);
    assert!(h.journal.calls().is_empty());
}
