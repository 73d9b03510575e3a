//! Page-aware display state
//!
//! The display cannot be written blindly: a text assignment only sticks on
//! the page that owns the field. [`PanelView`] keeps the desired value of
//! every field, writes a field only when its value changes and its page is
//! showing, and re-flushes a whole page when the display reports switching
//! to it.

use heapless::String;

use ampbench_protocol::module::avrcp::{
    AttributeMap, ATTR_ALBUM, ATTR_ARTIST, ATTR_GENRE, ATTR_TITLE, ATTR_TOTAL_TRACKS,
    ATTR_TRACK_NUMBER,
};
use ampbench_protocol::panel::text::{
    format_duration_ms, sanitize_text, set_text_command, PLACEHOLDER, TEXT_MAX,
};

use crate::queue::CommandQueue;

/// Page showing only the EQ preset
pub const PAGE_MAIN: u8 = 0;

/// Page showing EQ plus track metadata and playback times
pub const PAGE_NOW_PLAYING: u8 = 1;

/// Display fields, one entry per text object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Eq,
    Title,
    Artist,
    Album,
    Genre,
    TimeCurrent,
    TimeTotal,
    TrackNumber,
    TotalTracks,
}

impl Field {
    /// The text object carrying this field on the given page, if any.
    /// The EQ label exists on both pages under different names.
    fn object_on(self, page: u8) -> Option<&'static str> {
        match (self, page) {
            (Field::Eq, PAGE_MAIN) => Some("tEQ0"),
            (Field::Eq, PAGE_NOW_PLAYING) => Some("tEQ1"),
            (Field::Title, PAGE_NOW_PLAYING) => Some("tTitle"),
            (Field::Artist, PAGE_NOW_PLAYING) => Some("tArtist"),
            (Field::Album, PAGE_NOW_PLAYING) => Some("tAlbum"),
            (Field::Genre, PAGE_NOW_PLAYING) => Some("tGenre"),
            (Field::TimeCurrent, PAGE_NOW_PLAYING) => Some("tTIME_CUR"),
            (Field::TimeTotal, PAGE_NOW_PLAYING) => Some("tTime"),
            (Field::TrackNumber, PAGE_NOW_PLAYING) => Some("tTrack_num"),
            (Field::TotalTracks, PAGE_NOW_PLAYING) => Some("tTotalTracks"),
            _ => None,
        }
    }
}

const FIELDS: [Field; 9] = [
    Field::Eq,
    Field::Title,
    Field::Artist,
    Field::Album,
    Field::Genre,
    Field::TimeCurrent,
    Field::TimeTotal,
    Field::TrackNumber,
    Field::TotalTracks,
];

/// Desired display state with page-aware flushing
#[derive(Debug)]
pub struct PanelView {
    values: [String<TEXT_MAX>; FIELDS.len()],
    page: Option<u8>,
}

impl Default for PanelView {
    fn default() -> Self {
        let mut values: [String<TEXT_MAX>; FIELDS.len()] = Default::default();
        for value in &mut values {
            let _ = value.push_str(PLACEHOLDER);
        }
        Self { values, page: None }
    }
}

impl PanelView {
    /// Create a view with every field at the placeholder
    pub fn new() -> Self {
        Self::default()
    }

    /// The page the display last reported, if any
    pub fn page(&self) -> Option<u8> {
        self.page
    }

    /// Handle a page-change notification: remember the page and re-flush
    /// every field it owns, even if the id did not change (the display
    /// may have redrawn the page from scratch).
    pub fn page_changed(&mut self, page: u8, queue: &mut CommandQueue) {
        self.page = Some(page);
        for (i, field) in FIELDS.iter().enumerate() {
            if let Some(obj) = field.object_on(page) {
                queue.enqueue(set_text_command(obj, &self.values[i]));
            }
        }
    }

    /// Set the EQ preset label
    pub fn set_eq_label(&mut self, label: &str, queue: &mut CommandQueue) {
        self.update(Field::Eq, sanitize_text(label), queue);
    }

    /// Apply a completed metadata map to the track fields
    pub fn set_metadata(&mut self, map: &AttributeMap, queue: &mut CommandQueue) {
        self.update(Field::Title, text_attr(map, ATTR_TITLE), queue);
        self.update(Field::Artist, text_attr(map, ATTR_ARTIST), queue);
        self.update(Field::Album, text_attr(map, ATTR_ALBUM), queue);
        self.update(Field::Genre, text_attr(map, ATTR_GENRE), queue);
        self.update(Field::TrackNumber, text_attr(map, ATTR_TRACK_NUMBER), queue);
        self.update(Field::TotalTracks, text_attr(map, ATTR_TOTAL_TRACKS), queue);
    }

    /// Update the playback position and total duration fields
    pub fn set_times(&mut self, position_ms: u32, length_ms: u32, queue: &mut CommandQueue) {
        self.update(Field::TimeCurrent, duration_text(position_ms), queue);
        self.update(Field::TimeTotal, duration_text(length_ms), queue);
    }

    /// Reset every field except the EQ label to the placeholder
    /// (disconnect: the EQ preset is a device setting, not track state)
    pub fn clear_track_state(&mut self, queue: &mut CommandQueue) {
        for field in [
            Field::Title,
            Field::Artist,
            Field::Album,
            Field::Genre,
            Field::TimeCurrent,
            Field::TimeTotal,
            Field::TrackNumber,
            Field::TotalTracks,
        ] {
            self.update(field, placeholder(), queue);
        }
    }

    fn update(&mut self, field: Field, value: String<TEXT_MAX>, queue: &mut CommandQueue) {
        let idx = FIELDS.iter().position(|&f| f == field).unwrap_or(0);
        if self.values[idx] == value {
            return;
        }
        self.values[idx] = value;
        if let Some(obj) = self.page.and_then(|p| field.object_on(p)) {
            queue.enqueue(set_text_command(obj, &self.values[idx]));
        }
    }
}

fn text_attr(map: &AttributeMap, id: u32) -> String<TEXT_MAX> {
    match map.get(id) {
        Some(text) => sanitize_text(text),
        None => placeholder(),
    }
}

fn duration_text(ms: u32) -> String<TEXT_MAX> {
    // 0xFFFFFFFF means the player does not report this value
    if ms == u32::MAX {
        return placeholder();
    }
    let mut out = String::new();
    let _ = out.push_str(&format_duration_ms(ms));
    out
}

fn placeholder() -> String<TEXT_MAX> {
    let mut s = String::new();
    let _ = s.push_str(PLACEHOLDER);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pump the queue from `now` until empty, skipping heartbeats
    fn drain(queue: &mut CommandQueue, mut now: u64) -> heapless::Vec<String<96>, 16> {
        let mut out = heapless::Vec::new();
        while let Some(cmd) = queue.poll(now) {
            if cmd != "sendme" && out.push(cmd).is_err() {
                break;
            }
            now += 35;
        }
        out
    }

    #[test]
    fn test_no_writes_before_page_known() {
        let mut view = PanelView::new();
        let mut queue = CommandQueue::new();
        view.set_eq_label("ROCK", &mut queue);
        assert!(drain(&mut queue, 10_000).is_empty());
    }

    #[test]
    fn test_page_change_flushes_fields() {
        let mut view = PanelView::new();
        let mut queue = CommandQueue::new();
        view.set_eq_label("BASS", &mut queue);

        view.page_changed(PAGE_MAIN, &mut queue);
        let cmds = drain(&mut queue, 10_000);
        assert_eq!(cmds.as_slice(), &["tEQ0.txt=\"BASS\""]);

        view.page_changed(PAGE_NOW_PLAYING, &mut queue);
        let cmds = drain(&mut queue, 20_000);
        assert_eq!(cmds.len(), 9);
        assert_eq!(cmds[0].as_str(), "tEQ1.txt=\"BASS\"");
        assert!(cmds.iter().any(|c| c == "tTitle.txt=\"-\""));
    }

    #[test]
    fn test_unchanged_value_not_rewritten() {
        let mut view = PanelView::new();
        let mut queue = CommandQueue::new();
        view.page_changed(PAGE_MAIN, &mut queue);
        drain(&mut queue, 10_000);

        view.set_eq_label("JAZZ", &mut queue);
        assert_eq!(drain(&mut queue, 20_000).len(), 1);
        view.set_eq_label("JAZZ", &mut queue);
        assert!(drain(&mut queue, 30_000).is_empty());
    }

    #[test]
    fn test_times_on_now_playing_page() {
        let mut view = PanelView::new();
        let mut queue = CommandQueue::new();
        view.page_changed(PAGE_NOW_PLAYING, &mut queue);
        drain(&mut queue, 10_000);

        view.set_times(65_000, 215_000, &mut queue);
        let cmds = drain(&mut queue, 20_000);
        assert!(cmds.iter().any(|c| c == "tTIME_CUR.txt=\"1:05\""));
        assert!(cmds.iter().any(|c| c == "tTime.txt=\"3:35\""));
    }

    #[test]
    fn test_clear_track_state_keeps_eq() {
        let mut view = PanelView::new();
        let mut queue = CommandQueue::new();
        view.page_changed(PAGE_NOW_PLAYING, &mut queue);
        view.set_eq_label("POP", &mut queue);
        view.set_times(1_000, 2_000, &mut queue);
        drain(&mut queue, 10_000);

        view.clear_track_state(&mut queue);
        let cmds = drain(&mut queue, 20_000);
        assert!(cmds.iter().all(|c| !c.starts_with("tEQ1")));
        assert!(cmds.iter().any(|c| c == "tTIME_CUR.txt=\"-\""));
    }
}
