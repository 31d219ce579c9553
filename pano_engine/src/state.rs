use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationPhase {
    Idle,
    Loading,
    FadingOut,
    FadingIn,
}

impl NavigationPhase {
    pub fn label(self) -> &'static str {
        match self {
            NavigationPhase::Idle => "idle",
            NavigationPhase::Loading => "loading",
            NavigationPhase::FadingOut => "fading_out",
            NavigationPhase::FadingIn => "fading_in",
        }
    }
}

impl fmt::Display for NavigationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the viewer is and where it is heading.
///
/// `current_node` only changes once a load for the pending target has
/// resolved successfully. `pending_target` is set exactly while a navigation
/// is in progress before arrival, and `generation` increases with every
/// navigation so stale load results can be recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationState {
    current_node: Option<String>,
    phase: NavigationPhase,
    pending_target: Option<String>,
    default_target: String,
    generation: u64,
}

impl NavigationState {
    pub fn new(default_target: impl Into<String>) -> Self {
        Self {
            current_node: None,
            phase: NavigationPhase::Idle,
            pending_target: None,
            default_target: default_target.into(),
            generation: 0,
        }
    }

    pub fn current_node(&self) -> Option<&str> {
        self.current_node.as_deref()
    }

    pub fn phase(&self) -> NavigationPhase {
        self.phase
    }

    pub fn pending_target(&self) -> Option<&str> {
        self.pending_target.as_deref()
    }

    pub fn default_target(&self) -> &str {
        &self.default_target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_idle(&self) -> bool {
        self.phase == NavigationPhase::Idle
    }

    /// Records a new destination and returns its generation. The phase is
    /// left to the caller.
    pub(crate) fn begin(&mut self, target: &str) -> u64 {
        self.generation += 1;
        self.pending_target = Some(target.to_string());
        self.generation
    }

    pub(crate) fn set_phase(&mut self, phase: NavigationPhase) {
        self.phase = phase;
    }

    /// The pending load succeeded; the target becomes current.
    pub(crate) fn arrive(&mut self) -> Option<&str> {
        let target = self.pending_target.take()?;
        self.current_node = Some(target);
        self.current_node.as_deref()
    }

    /// The fade-in after arrival finished.
    pub(crate) fn settle(&mut self) -> Option<&str> {
        self.phase = NavigationPhase::Idle;
        self.current_node.as_deref()
    }

    /// Drops the pending target and returns to `Idle` at the current node.
    pub(crate) fn abort(&mut self) -> Option<String> {
        self.phase = NavigationPhase::Idle;
        self.pending_target.take()
    }
}
