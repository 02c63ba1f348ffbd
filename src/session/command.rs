// Session commands - One variant per user input
//
// Front ends translate key presses, clicks and scroll events into these and hand
// them to `Session::handle`.

use std::path::PathBuf;

use crate::fragment::FragmentId;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Load sound files and append one fragment per file
    OpenFiles(Vec<PathBuf>),
    TogglePlay,
    DeleteSelected,
    /// Select everything, or clear if everything is already selected
    SelectAll,
    ClearSelection,
    SelectFragment { id: FragmentId, multi: bool },
    /// Click on the canvas; `multi` extends the selection
    Click { x: f64, y: f64, multi: bool },
    /// Rename the fragment if exactly one is selected
    RenameSelected(String),
    ZoomIn,
    ZoomOut,
    /// Move the start line by `dx` pixels
    Pan(f64),
    SetCursorX(f64),
    SetBpm(u32),
    MoveSelectionUp,
    MoveSelectionDown,
    DragFragment { id: FragmentId, x: f64 },
    TrackHeightUp,
    TrackHeightDown,
    CycleColor(FragmentId),
    ToggleMute(FragmentId),
    ToggleSolo(FragmentId),
    SetVolume { id: FragmentId, volume: f32 },
    Shutdown,
}

impl Command {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenFiles(_) => "open files",
            Command::TogglePlay => "toggle play",
            Command::DeleteSelected => "delete selected",
            Command::SelectAll => "select all",
            Command::ClearSelection => "clear selection",
            Command::SelectFragment { .. } => "select fragment",
            Command::Click { .. } => "click",
            Command::RenameSelected(_) => "rename",
            Command::ZoomIn => "zoom in",
            Command::ZoomOut => "zoom out",
            Command::Pan(_) => "pan",
            Command::SetCursorX(_) => "set cursor",
            Command::SetBpm(_) => "set bpm",
            Command::MoveSelectionUp => "move up",
            Command::MoveSelectionDown => "move down",
            Command::DragFragment { .. } => "drag",
            Command::TrackHeightUp => "track height up",
            Command::TrackHeightDown => "track height down",
            Command::CycleColor(_) => "cycle colour",
            Command::ToggleMute(_) => "toggle mute",
            Command::ToggleSolo(_) => "toggle solo",
            Command::SetVolume { .. } => "set volume",
            Command::Shutdown => "shutdown",
        }
    }
}
