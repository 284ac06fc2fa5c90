// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Ping-pong buffers.
//!
//! Two equal-length buffers, one of which is current.  A pass reads
//! only the current buffer and writes only the other one, then the two
//! trade roles.  That discipline is the only synchronisation the
//! iterative engines need.

use crate::dispatch::Dispatcher;

/// A pair of buffers with swapping roles.
#[derive(Clone, Debug)]
pub struct DoubleBuffer<T> {
    buffers: [Vec<T>; 2],
    front: usize,
}

impl<T> DoubleBuffer<T>
where
    T: Clone + Send + Sync,
{
    /// Two buffers of `len` copies of `fill`.
    pub fn new(len: usize, fill: T) -> Self {
        DoubleBuffer {
            buffers: [vec![fill.clone(); len], vec![fill; len]],
            front: 0,
        }
    }

    /// Number of cells in each buffer.
    pub fn len(&self) -> usize {
        self.buffers[0].len()
    }

    /// True when the buffers hold nothing.
    pub fn is_empty(&self) -> bool {
        self.buffers[0].is_empty()
    }

    /// The current buffer.
    pub fn front(&self) -> &[T] {
        &self.buffers[self.front]
    }

    /// Which of the two buffers is current; only useful for checking
    /// that roles really alternate.
    pub fn front_index(&self) -> usize {
        self.front
    }

    /// Throws both buffers away and allocates new ones.
    pub fn resize(&mut self, len: usize, fill: T) {
        *self = DoubleBuffer::new(len, fill);
    }

    /// Writes every cell of the current buffer from scratch.  Nothing
    /// from earlier passes survives.
    pub fn initialize<F>(&mut self, dispatcher: &Dispatcher, init: F)
    where
        F: Fn(usize) -> T + Sync,
    {
        let front = self.front;
        dispatcher.run(&mut self.buffers[front], init);
    }

    /// Runs one pass: `step(i, front)` becomes cell `i` of the back
    /// buffer, then the roles swap.
    pub fn pass<F>(&mut self, dispatcher: &Dispatcher, step: F)
    where
        F: Fn(usize, &[T]) -> T + Sync,
    {
        let (first, second) = self.buffers.split_at_mut(1);
        let (front, back) = if self.front == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        };
        let front: &[T] = front;
        dispatcher.run(back, |i| step(i, front));
        self.swap();
    }

    /// Exchanges the roles of the two buffers.
    pub fn swap(&mut self) {
        self.front ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_read_the_front_and_swap() {
        let dispatcher = Dispatcher::new(3);
        let mut buf = DoubleBuffer::new(10, 0u32);
        buf.initialize(&dispatcher, |i| i as u32);
        assert_eq!(buf.front_index(), 0);

        // Every cell reads its right neighbour.  In-place updating would
        // smear values leftwards; a real double buffer shifts by one.
        buf.pass(&dispatcher, |i, front| front[(i + 1) % front.len()]);
        assert_eq!(buf.front_index(), 1);
        assert_eq!(buf.front(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 0]);

        buf.pass(&dispatcher, |i, front| front[(i + 1) % front.len()]);
        assert_eq!(buf.front_index(), 0);
        assert_eq!(buf.front(), &[2, 3, 4, 5, 6, 7, 8, 9, 0, 1]);
    }

    #[test]
    fn resize_discards_everything() {
        let dispatcher = Dispatcher::new(1);
        let mut buf = DoubleBuffer::new(4, 7i32);
        buf.pass(&dispatcher, |_, _| 1);
        buf.resize(6, -1);
        assert_eq!(buf.len(), 6);
        assert_eq!(buf.front_index(), 0);
        assert!(buf.front().iter().all(|v| *v == -1));
    }
}
