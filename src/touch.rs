//! Touch input.
//!
//! The touch controller is independent of the display pipeline. A
//! [`TouchController`] reports raw samples in panel coordinates;
//! [`TouchInput`] applies the mounting orientation and only reports touches
//! once the controller has been initialised.

use bitfield::bitfield;
use embedded_graphics::prelude::Point;

use crate::error::{Error, Result};

bitfield! {
    /// Mounting orientation of the touch sensor relative to the display.
    #[derive(Clone, Copy, PartialEq, Eq, Default)]
    pub struct TouchOrientation(u8);
    impl Debug;
    /// Mirror the X axis.
    pub swap_x, set_swap_x: 0;
    /// Mirror the Y axis.
    pub swap_y, set_swap_y: 1;
    /// Exchange the axes.
    pub swap_xy, set_swap_xy: 2;
}

#[cfg(feature = "defmt")]
impl defmt::Format for TouchOrientation {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "TouchOrientation {{ swap_x: {}, swap_y: {}, swap_xy: {} }}",
            self.swap_x(),
            self.swap_y(),
            self.swap_xy()
        );
    }
}

impl TouchOrientation {
    /// Orientation with the given flags.
    #[must_use]
    pub fn new(swap_x: bool, swap_y: bool, swap_xy: bool) -> Self {
        let mut orientation = Self::default();
        orientation.set_swap_x(swap_x);
        orientation.set_swap_y(swap_y);
        orientation.set_swap_xy(swap_xy);
        orientation
    }
}

/// One raw controller sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchSample {
    /// A finger is on the panel.
    pub detected: bool,
    /// Raw X coordinate.
    pub x: u16,
    /// Raw Y coordinate.
    pub y: u16,
}

/// Touch controller driver.
pub trait TouchController {
    /// Prepares the controller for a `width` × `height` panel.
    ///
    /// # Errors
    ///
    /// Whatever the controller transport reports.
    fn init(&mut self, width: u16, height: u16, orientation: TouchOrientation) -> Result<()>;

    /// Reads the current touch state.
    ///
    /// # Errors
    ///
    /// Whatever the controller transport reports.
    fn sample(&mut self) -> Result<TouchSample>;
}

/// Oriented touch reports from a [`TouchController`].
#[derive(Debug)]
pub struct TouchInput<T> {
    controller: T,
    width: u16,
    height: u16,
    orientation: TouchOrientation,
    initialized: bool,
}

impl<T: TouchController> TouchInput<T> {
    /// Touch input over a `width` × `height` display.
    pub const fn new(
        controller: T,
        width: u16,
        height: u16,
        orientation: TouchOrientation,
    ) -> Self {
        Self {
            controller,
            width,
            height,
            orientation,
            initialized: false,
        }
    }

    /// Initialises the controller.
    ///
    /// # Errors
    ///
    /// [`Error::WrongParam`] for an empty display, otherwise
    /// [`Error::ComponentFailure`] if the controller cannot be initialised.
    pub fn init(&mut self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::WrongParam);
        }
        self.initialized = false;
        self.controller
            .init(self.width, self.height, self.orientation)
            .map_err(|_| Error::ComponentFailure)?;
        self.initialized = true;
        Ok(())
    }

    /// Returns `true` after a successful [`init`](Self::init).
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Current touch position in display coordinates, or `None` when
    /// nothing touches the panel or the controller is not initialised.
    ///
    /// # Errors
    ///
    /// [`Error::BusFailure`] if the controller cannot be read.
    pub fn poll(&mut self) -> Result<Option<Point>> {
        if !self.initialized {
            return Ok(None);
        }
        let sample = self.controller.sample().map_err(|_| Error::BusFailure)?;
        if !sample.detected {
            return Ok(None);
        }
        Ok(Some(self.orient(sample.x, sample.y)))
    }

    fn orient(&self, x: u16, y: u16) -> Point {
        let (width, height) = if self.orientation.swap_xy() {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        };
        let mut x = x.min(width - 1);
        let mut y = y.min(height - 1);
        if self.orientation.swap_x() {
            x = width - 1 - x;
        }
        if self.orientation.swap_y() {
            y = height - 1 - y;
        }
        if self.orientation.swap_xy() {
            core::mem::swap(&mut x, &mut y);
        }
        Point::new(i32::from(x), i32::from(y))
    }

    /// Shared access to the controller.
    pub const fn controller(&self) -> &T {
        &self.controller
    }

    /// Releases the controller.
    pub fn release(self) -> T {
        self.controller
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::vec::Vec;

    use super::*;

    #[derive(Default)]
    struct FakeController {
        samples: Vec<TouchSample>,
        fail_init: bool,
        fail_sample: bool,
        init_args: Option<(u16, u16, TouchOrientation)>,
    }

    impl TouchController for FakeController {
        fn init(&mut self, width: u16, height: u16, orientation: TouchOrientation) -> Result<()> {
            if self.fail_init {
                return Err(Error::BusFailure);
            }
            self.init_args = Some((width, height, orientation));
            Ok(())
        }

        fn sample(&mut self) -> Result<TouchSample> {
            if self.fail_sample {
                return Err(Error::BusFailure);
            }
            Ok(self.samples.pop().unwrap_or_default())
        }
    }

    fn touch(x: u16, y: u16) -> TouchSample {
        TouchSample { detected: true, x, y }
    }

    #[test]
    fn test_orientation_bits() {
        let o = TouchOrientation::new(true, false, true);
        assert!(o.swap_x());
        assert!(!o.swap_y());
        assert!(o.swap_xy());
        assert_eq!(o, TouchOrientation(0b101));
    }

    #[test]
    fn test_no_report_before_init() {
        let controller = FakeController {
            samples: std::vec![touch(1, 2)],
            ..FakeController::default()
        };
        let mut input = TouchInput::new(controller, 800, 480, TouchOrientation::default());
        assert!(!input.is_initialized());
        assert_eq!(input.poll(), Ok(None));
        assert_eq!(input.controller().samples.len(), 1);
    }

    #[test]
    fn test_reports_only_detected_touches() {
        let controller = FakeController {
            samples: std::vec![TouchSample::default(), touch(100, 200)],
            ..FakeController::default()
        };
        let mut input = TouchInput::new(controller, 800, 480, TouchOrientation::default());
        input.init().unwrap();
        assert_eq!(
            input.controller().init_args,
            Some((800, 480, TouchOrientation::default()))
        );
        assert_eq!(input.poll(), Ok(Some(Point::new(100, 200))));
        assert_eq!(input.poll(), Ok(None));
    }

    #[test]
    fn test_mirrored_axes() {
        let controller = FakeController {
            samples: std::vec![touch(0, 479)],
            ..FakeController::default()
        };
        let orientation = TouchOrientation::new(true, true, false);
        let mut input = TouchInput::new(controller, 800, 480, orientation);
        input.init().unwrap();
        assert_eq!(input.poll(), Ok(Some(Point::new(799, 0))));
    }

    #[test]
    fn test_exchanged_axes() {
        // sensor mounted in portrait under a landscape display
        let controller = FakeController {
            samples: std::vec![touch(10, 700), touch(479, 799)],
            ..FakeController::default()
        };
        let orientation = TouchOrientation::new(false, false, true);
        let mut input = TouchInput::new(controller, 800, 480, orientation);
        input.init().unwrap();
        assert_eq!(input.poll(), Ok(Some(Point::new(799, 479))));
        assert_eq!(input.poll(), Ok(Some(Point::new(700, 10))));
    }

    #[test]
    fn test_out_of_range_sample_is_clamped() {
        let controller = FakeController {
            samples: std::vec![touch(5000, 5000)],
            ..FakeController::default()
        };
        let mut input = TouchInput::new(controller, 800, 480, TouchOrientation::default());
        input.init().unwrap();
        assert_eq!(input.poll(), Ok(Some(Point::new(799, 479))));
    }

    #[test]
    fn test_failures() {
        let controller = FakeController {
            fail_init: true,
            ..FakeController::default()
        };
        let mut input = TouchInput::new(controller, 800, 480, TouchOrientation::default());
        assert_eq!(input.init(), Err(Error::ComponentFailure));
        assert!(!input.is_initialized());
        assert_eq!(input.poll(), Ok(None));

        let controller = FakeController {
            fail_sample: true,
            ..FakeController::default()
        };
        let mut input = TouchInput::new(controller, 800, 480, TouchOrientation::default());
        input.init().unwrap();
        assert_eq!(input.poll(), Err(Error::BusFailure));

        let mut empty =
            TouchInput::new(FakeController::default(), 0, 480, TouchOrientation::default());
        assert_eq!(empty.init(), Err(Error::WrongParam));
    }
}
