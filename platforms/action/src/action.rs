use keymap::KeyMap;

/// Key bindings shared by the interactive front ends.
#[derive(KeyMap, Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// Quit the application
    #[key("q")]
    Quit,
    /// Restore the initial tape and state
    #[key("r")]
    Reset,
    /// Execute one transition
    #[key("space")]
    Step,
    /// Run continuously until halt or pause
    #[key("p")]
    ToggleAutoPlay,
    #[key("h")]
    ToggleHelp,
    /// Run more steps per auto-play tick
    #[key("f")]
    Faster,
    /// Run fewer steps per auto-play tick
    #[key("s")]
    Slower,
    /// Show the previous built-in machine
    #[key("left")]
    PreviousMachine,
    /// Show the next built-in machine
    #[key("right")]
    NextMachine,
    /// Pan the tape window to the left
    #[key("a")]
    PanLeft,
    /// Pan the tape window to the right
    #[key("d")]
    PanRight,
    /// Recenter the tape window on the head
    #[key("c")]
    Recenter,
}
