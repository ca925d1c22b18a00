//! Register set shared between the acquisition lane and the HTTP service.
//!
//! Three registers cross the lane boundary:
//!
//! | register  | writer      | reader      |
//! |-----------|-------------|-------------|
//! | command   | HTTP        | acquisition |
//! | led state | acquisition | HTTP        |
//! | temp raw  | acquisition | HTTP        |
//!
//! The single-writer rule is enforced by splitting the set into two ports,
//! [`CommandPort`] and [`AcquisitionPort`]. Neither port is `Clone`, and
//! [`SharedRegisters::split`] borrows the set mutably, so only one pair of
//! writers can exist at a time.
//!
//! LED state and temperature are stored in one 32-bit word laid out as
//! `(led_state << 16) | temp_raw`. A reader therefore never pairs the LED
//! state of one cycle with the temperature of another.

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Backing storage for the registers. Create once, split once.
#[derive(Debug, Default)]
pub struct SharedRegisters {
    command: AtomicU8,
    status: AtomicU32,
}

impl SharedRegisters {
    /// All registers start at zero.
    pub const fn new() -> Self {
        Self {
            command: AtomicU8::new(0),
            status: AtomicU32::new(0),
        }
    }

    /// Hand out the writer side of each lane.
    pub fn split(&mut self) -> (CommandPort<'_>, AcquisitionPort<'_>) {
        let regs: &Self = self;
        (CommandPort { regs }, AcquisitionPort { regs })
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::unpack(self.status.load(Ordering::Acquire))
    }
}

/// A consistent view of the acquisition-side registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub led_state: u8,
    pub temp_raw: u16,
}

impl Snapshot {
    /// `(led_state << 16) | temp_raw`
    pub const fn packed(&self) -> u32 {
        ((self.led_state as u32) << 16) | self.temp_raw as u32
    }

    const fn unpack(word: u32) -> Self {
        Self {
            led_state: (word >> 16) as u8,
            temp_raw: word as u16,
        }
    }
}

/// HTTP-side handle: the only writer of the command register.
#[derive(Debug)]
pub struct CommandPort<'a> {
    regs: &'a SharedRegisters,
}

impl CommandPort<'_> {
    /// Queue an LED command for the next acquisition cycle.
    ///
    /// A command that has not been picked up yet is overwritten.
    pub fn write_command(&self, command: u8) {
        self.regs.command.store(command, Ordering::Release);
    }

    /// The command waiting for the next cycle, or 0 once it has been consumed.
    pub fn pending_command(&self) -> u8 {
        self.regs.command.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.regs.snapshot()
    }
}

/// Acquisition-side handle: consumes commands, publishes slave state.
#[derive(Debug)]
pub struct AcquisitionPort<'a> {
    regs: &'a SharedRegisters,
}

impl AcquisitionPort<'_> {
    /// Read the pending command and reset the register to 0 in one step.
    pub fn take_command(&self) -> u8 {
        self.regs.command.swap(0, Ordering::AcqRel)
    }

    /// Publish the LED state and temperature of one cycle together.
    pub fn publish(&self, snapshot: Snapshot) {
        self.regs.status.store(snapshot.packed(), Ordering::Release);
    }

    /// Last published values.
    pub fn snapshot(&self) -> Snapshot {
        self.regs.snapshot()
    }
}
