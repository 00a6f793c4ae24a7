//! Everything outside the pure kernel: speech engines, the pathway view and
//! the screen. The reactor only talks to them through [`Gateway`].

pub mod console;

use crate::error::GatewayError;
use crate::kernel::event::Event;
use crate::kernel::scheduler::SideEffect;

pub use console::ConsoleHarness;

pub trait Gateway {
    /// Carries out one effect requested by the kernel.
    fn execute(&mut self, effect: SideEffect) -> Result<(), GatewayError>;

    /// Engine and collaborator signals produced since the last poll.
    fn poll(&mut self) -> Vec<Event>;
}
