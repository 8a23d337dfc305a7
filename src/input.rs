//! Host input to browser input.
//!
//! Pure mapping: nothing here holds state between events.

use crate::foundation::core::Viewport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Other(u8),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Escape,
    Other(u32),
}

/// Event as polled from the windowing layer, in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PointerDown { x: i32, y: i32, button: MouseButton },
    PointerUp { x: i32, y: i32, button: MouseButton },
    PointerMove { x: i32, y: i32 },
    KeyDown { key: Key },
    Resized { width: u32, height: u32 },
    Quit,
    Other,
}

/// Event in the browser's vocabulary, in viewport coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserInputEvent {
    MouseClick {
        x: i32,
        y: i32,
        button: MouseButton,
        mouse_up: bool,
        click_count: u32,
    },
    MouseMove {
        x: i32,
        y: i32,
        mouse_up: bool,
    },
}

/// Quit request or Escape. Ends the loop instead of reaching the browser.
pub fn is_quit(event: &HostEvent) -> bool {
    matches!(
        event,
        HostEvent::Quit
            | HostEvent::KeyDown {
                key: Key::Escape
            }
    )
}

/// Map one host event into the browser's coordinate space.
///
/// Only the primary button is forwarded. Pointer events outside `viewport` and every other
/// event kind produce `None`.
pub fn translate(event: &HostEvent, viewport: &Viewport) -> Option<BrowserInputEvent> {
    match *event {
        HostEvent::PointerDown { x, y, button } => click(x, y, button, false, viewport),
        HostEvent::PointerUp { x, y, button } => click(x, y, button, true, viewport),
        HostEvent::PointerMove { x, y } => {
            if !viewport.contains(x, y) {
                return None;
            }
            let (x, y) = viewport.rebase(x, y);
            Some(BrowserInputEvent::MouseMove {
                x,
                y,
                mouse_up: true,
            })
        }
        HostEvent::KeyDown { .. }
        | HostEvent::Resized { .. }
        | HostEvent::Quit
        | HostEvent::Other => None,
    }
}

fn click(
    x: i32,
    y: i32,
    button: MouseButton,
    mouse_up: bool,
    viewport: &Viewport,
) -> Option<BrowserInputEvent> {
    if button != MouseButton::Left || !viewport.contains(x, y) {
        return None;
    }
    let (x, y) = viewport.rebase(x, y);
    Some(BrowserInputEvent::MouseClick {
        x,
        y,
        button,
        mouse_up,
        click_count: 1,
    })
}
