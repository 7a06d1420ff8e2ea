use parking_lot::Mutex;

use crate::layout::GridGeometry;
use crate::models::ItemId;

/// Receives what the view layer needs to draw the grid chrome.
pub trait FocusSink: Send + Sync {
    /// 1-based position of the focused card and the total item count.
    fn counter_changed(&self, position: usize, total: usize);

    fn geometry_changed(&self, geometry: &GridGeometry);

    fn status_changed(&self, status: &str);

    /// Focused item's info line changed (empty when nothing is focused).
    fn info_changed(&self, _info: &str) {}
}

/// Opens an item on confirm.
pub trait Navigator: Send + Sync {
    fn open_item(&self, id: ItemId);
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl FocusSink for NullSink {
    fn counter_changed(&self, _position: usize, _total: usize) {}

    fn geometry_changed(&self, _geometry: &GridGeometry) {}

    fn status_changed(&self, _status: &str) {}
}

impl Navigator for NullSink {
    fn open_item(&self, _id: ItemId) {}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Counter { position: usize, total: usize },
    Geometry(GridGeometry),
    Status(String),
    Info(String),
    Opened(ItemId),
}

/// Keeps every event in order; used by the driver and tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    pub fn last_counter(&self) -> Option<(usize, usize)> {
        self.events.lock().iter().rev().find_map(|event| match event {
            SinkEvent::Counter { position, total } => Some((*position, *total)),
            _ => None,
        })
    }

    pub fn last_status(&self) -> Option<String> {
        self.events.lock().iter().rev().find_map(|event| match event {
            SinkEvent::Status(status) => Some(status.clone()),
            _ => None,
        })
    }

    pub fn opened(&self) -> Vec<ItemId> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                SinkEvent::Opened(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().push(event);
    }
}

impl FocusSink for RecordingSink {
    fn counter_changed(&self, position: usize, total: usize) {
        self.push(SinkEvent::Counter { position, total });
    }

    fn geometry_changed(&self, geometry: &GridGeometry) {
        self.push(SinkEvent::Geometry(*geometry));
    }

    fn status_changed(&self, status: &str) {
        self.push(SinkEvent::Status(status.to_string()));
    }

    fn info_changed(&self, info: &str) {
        self.push(SinkEvent::Info(info.to_string()));
    }
}

impl Navigator for RecordingSink {
    fn open_item(&self, id: ItemId) {
        self.push(SinkEvent::Opened(id));
    }
}
