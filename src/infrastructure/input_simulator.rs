use crate::domain::actuation::InputSink;
use tracing::{debug, trace};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    SendInput, INPUT, INPUT_0, INPUT_MOUSE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MOVE, MOUSEINPUT, MOUSE_EVENT_FLAGS,
};

/// Pointer injection through `SendInput`
#[derive(Debug, Default)]
pub struct InputSimulator;

impl InputSimulator {
    pub fn new() -> Self {
        Self
    }

    fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx,
                    dy,
                    mouseData: 0,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        }
    }

    fn send(inputs: &[INPUT]) -> anyhow::Result<()> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            anyhow::bail!("SendInput injected {} of {} events", sent, inputs.len());
        }
        Ok(())
    }

    /// Move mouse by relative offset
    pub fn move_mouse(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        trace!("Moving mouse by ({}, {})", dx, dy);
        Self::send(&[Self::mouse_input(dx, dy, MOUSEEVENTF_MOVE)])
    }

    /// Simulate left mouse button down
    pub fn mouse_left_down(&self) -> anyhow::Result<()> {
        debug!("Mouse Left Down");
        Self::send(&[Self::mouse_input(0, 0, MOUSEEVENTF_LEFTDOWN)])
    }

    /// Simulate left mouse button up
    pub fn mouse_left_up(&self) -> anyhow::Result<()> {
        debug!("Mouse Left Up");
        Self::send(&[Self::mouse_input(0, 0, MOUSEEVENTF_LEFTUP)])
    }

    /// Simulate left mouse click
    pub fn mouse_left_click(&self) -> anyhow::Result<()> {
        self.mouse_left_down()?;
        self.mouse_left_up()?;
        Ok(())
    }
}

impl InputSink for InputSimulator {
    fn move_relative(&self, dx: i32, dy: i32) -> anyhow::Result<()> {
        self.move_mouse(dx, dy)
    }

    fn click_primary(&self) -> anyhow::Result<()> {
        self.mouse_left_click()
    }
}
