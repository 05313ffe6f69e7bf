// Physical pointer/keyboard simulation.
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};

use crate::errors::{AutoQuizError, AutoQuizResult};
use crate::perception::types::Point;

/// Low-level input device. Exclusively owned by the interaction driver, so
/// no two calls are ever in flight.
pub trait InputDevice {
    fn move_to(&mut self, point: Point) -> AutoQuizResult<()>;
    fn position(&self) -> AutoQuizResult<Point>;
    fn click(&mut self) -> AutoQuizResult<()>;
    fn press(&mut self) -> AutoQuizResult<()>;
    fn release(&mut self) -> AutoQuizResult<()>;
    fn select_all(&mut self) -> AutoQuizResult<()>;
    fn type_text(&mut self, text: &str) -> AutoQuizResult<()>;
}

pub struct EnigoInput {
    enigo: Enigo,
}

impl EnigoInput {
    pub fn new() -> AutoQuizResult<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| AutoQuizError::InteractionFailed(format!("input init: {e}")))?;
        Ok(Self { enigo })
    }
}

fn platform(action: &str) -> impl FnOnce(enigo::InputError) -> AutoQuizError + '_ {
    move |e| AutoQuizError::InteractionFailed(format!("{action}: {e}"))
}

#[cfg(target_os = "macos")]
fn select_modifier() -> Key {
    Key::Meta
}

#[cfg(not(target_os = "macos"))]
fn select_modifier() -> Key {
    Key::Control
}

impl InputDevice for EnigoInput {
    fn move_to(&mut self, point: Point) -> AutoQuizResult<()> {
        self.enigo
            .move_mouse(point.x, point.y, Coordinate::Abs)
            .map_err(platform("move"))
    }

    fn position(&self) -> AutoQuizResult<Point> {
        let (x, y) = self.enigo.location().map_err(platform("location"))?;
        Ok(Point::new(x, y))
    }

    fn click(&mut self) -> AutoQuizResult<()> {
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(platform("click"))
    }

    fn press(&mut self) -> AutoQuizResult<()> {
        self.enigo
            .button(Button::Left, Direction::Press)
            .map_err(platform("button down"))
    }

    fn release(&mut self) -> AutoQuizResult<()> {
        self.enigo
            .button(Button::Left, Direction::Release)
            .map_err(platform("button up"))
    }

    fn select_all(&mut self) -> AutoQuizResult<()> {
        self.enigo
            .key(select_modifier(), Direction::Press)
            .map_err(platform("select all"))?;
        let typed = self
            .enigo
            .key(Key::Unicode('a'), Direction::Click)
            .map_err(platform("select all"));
        // Always release the modifier, even when the letter failed.
        self.enigo
            .key(select_modifier(), Direction::Release)
            .map_err(platform("select all"))?;
        typed
    }

    fn type_text(&mut self, text: &str) -> AutoQuizResult<()> {
        self.enigo.text(text).map_err(platform("type"))
    }
}
