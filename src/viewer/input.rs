//! Keyboard and mouse state, reduced to the actions the app understands.

use egui::{Key, PointerButton};

/// Discrete commands bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Select debug view 1..=5
    SelectView(u32),
    /// Solid rasterization
    FillMode,
    /// Wireframe rasterization of the scene geometry
    WireframeMode,
    Quit,
}

/// Key to action table.
#[derive(Debug, Clone)]
pub struct KeyBindings {
    bindings: Vec<(Key, Action)>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            bindings: vec![
                (Key::Num1, Action::SelectView(1)),
                (Key::Num2, Action::SelectView(2)),
                (Key::Num3, Action::SelectView(3)),
                (Key::Num4, Action::SelectView(4)),
                (Key::Num5, Action::SelectView(5)),
                (Key::F11, Action::FillMode),
                (Key::F12, Action::WireframeMode),
                (Key::Escape, Action::Quit),
            ],
        }
    }
}

impl KeyBindings {
    pub fn action(&self, key: Key) -> Option<Action> {
        self.bindings.iter().find(|(k, _)| *k == key).map(|(_, a)| *a)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Key, Action)> {
        self.bindings.iter()
    }
}

/// Everything the frame update reads from input, captured once per frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Actions whose key went down this frame
    pub actions: Vec<Action>,
    /// Right mouse held: look, zoom and movement apply
    pub camera_mode: bool,
    /// Pointer movement in points
    pub look: egui::Vec2,
    /// Vertical scroll in points
    pub scroll: f32,
    /// W/S axis, +1 forward
    pub forward: f32,
    /// D/A axis, +1 right
    pub right: f32,
    pub dt: f32,
}

impl InputSnapshot {
    /// Capture from egui. Keys are ignored while a text field has focus.
    pub fn capture(ctx: &egui::Context, bindings: &KeyBindings) -> Self {
        let typing = ctx.wants_keyboard_input();
        ctx.input(|i| {
            let actions = if typing {
                Vec::new()
            } else {
                bindings
                    .iter()
                    .filter(|(key, _)| i.key_pressed(*key))
                    .map(|(_, action)| *action)
                    .collect()
            };
            let axis = |pos: Key, neg: Key| {
                if typing {
                    return 0.0;
                }
                (i.key_down(pos) as i32 - i.key_down(neg) as i32) as f32
            };
            Self {
                actions,
                camera_mode: i.pointer.button_down(PointerButton::Secondary),
                look: i.pointer.delta(),
                scroll: i.smooth_scroll_delta.y,
                forward: axis(Key::W, Key::S),
                right: axis(Key::D, Key::A),
                dt: i.stable_dt,
            }
        })
    }

    pub fn has(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }
}
