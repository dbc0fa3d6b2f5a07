//! A heap-allocated array whose length is fixed at construction.
//!
//! [FixedBuffer] is used to stage data before it is uploaded to a GPU buffer or texture, and to
//! receive data that is read back from a GPU buffer.

use std::iter;
use std::mem;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::slice;
use std::thread;
use std::vec;

use bytemuck::{Pod, Zeroable};
use failure::Fail;

/// Buffers shorter than this are always filled on the calling thread.
const PARALLEL_FILL_THRESHOLD: usize = 1 << 16;

/// An owning, contiguous store of `T` whose element count never changes after construction.
///
/// Unlike a [Vec], a [FixedBuffer] can not grow or shrink; the only way to change its length is to
/// replace it with a different buffer. Zero-length buffers are valid.
///
/// # Example
///
/// ```
/// use retained_gl::FixedBuffer;
///
/// let mut buffer = FixedBuffer::filled(4, 1u32);
///
/// buffer[2] = 7;
///
/// assert_eq!(buffer.as_slice(), &[1, 1, 7, 1]);
/// assert!(buffer.at(4).is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct FixedBuffer<T> {
    data: Box<[T]>,
}

impl<T> FixedBuffer<T> {
    /// Creates a buffer of `len` default-initialized elements.
    pub fn new(len: usize) -> Self
    where
        T: Default,
    {
        FixedBuffer {
            data: iter::repeat_with(T::default).take(len).collect(),
        }
    }

    /// Creates a buffer of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self
    where
        T: Clone,
    {
        FixedBuffer {
            data: vec![value; len].into_boxed_slice(),
        }
    }

    /// Creates a buffer of `len` all-zero elements.
    pub fn zeroed(len: usize) -> Self
    where
        T: Zeroable,
    {
        FixedBuffer {
            data: iter::repeat_with(T::zeroed).take(len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns a reference to the element at `index`, or an [OutOfRange] error if `index` is not
    /// smaller than the length of the buffer.
    pub fn at(&self, index: usize) -> Result<&T, OutOfRange> {
        let len = self.data.len();

        self.data.get(index).ok_or(OutOfRange { index, len })
    }

    /// Returns a mutable reference to the element at `index`, or an [OutOfRange] error if `index`
    /// is not smaller than the length of the buffer.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut T, OutOfRange> {
        let len = self.data.len();

        self.data.get_mut(index).ok_or(OutOfRange { index, len })
    }

    /// Returns a reference to the element at `index` without bounds checking.
    ///
    /// # Unsafety
    ///
    /// `index` must be smaller than [len](FixedBuffer::len).
    pub unsafe fn get_unchecked(&self, index: usize) -> &T {
        self.data.get_unchecked(index)
    }

    /// Returns a mutable reference to the element at `index` without bounds checking.
    ///
    /// # Unsafety
    ///
    /// `index` must be smaller than [len](FixedBuffer::len).
    pub unsafe fn get_unchecked_mut(&mut self, index: usize) -> &mut T {
        self.data.get_unchecked_mut(index)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> slice::Iter<T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> slice::IterMut<T> {
        self.data.iter_mut()
    }

    /// Overwrites every element with a clone of `value`.
    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.data.fill(value);
    }

    /// Overwrites every element with a clone of `value`, splitting the work across worker threads
    /// when the buffer is large.
    ///
    /// The result is identical to [fill](FixedBuffer::fill). The call blocks until every element
    /// has been written.
    pub fn fill_parallel(&mut self, value: &T)
    where
        T: Clone + Send + Sync,
    {
        let len = self.data.len();
        let workers = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);

        if len < PARALLEL_FILL_THRESHOLD || workers < 2 {
            self.data.fill(value.clone());

            return;
        }

        let chunk_len = (len + workers - 1) / workers;

        thread::scope(|scope| {
            for chunk in self.data.chunks_mut(chunk_len) {
                scope.spawn(move || chunk.fill(value.clone()));
            }
        });
    }

    /// Copies all elements of `other` into this buffer.
    ///
    /// Both buffers must have the same length, otherwise a [SizeMismatch] error is returned and
    /// this buffer is left untouched.
    pub fn copy_from(&mut self, other: &FixedBuffer<T>) -> Result<(), SizeMismatch>
    where
        T: Clone,
    {
        if self.data.len() != other.data.len() {
            return Err(SizeMismatch {
                expected: self.data.len(),
                actual: other.data.len(),
            });
        }

        self.data.clone_from_slice(&other.data);

        Ok(())
    }

    /// Moves the storage out of this buffer and returns it as a new buffer, leaving this buffer
    /// with a length of `0`.
    pub fn take(&mut self) -> FixedBuffer<T> {
        FixedBuffer {
            data: mem::take(&mut self.data),
        }
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data.into_vec()
    }
}

impl<T> FixedBuffer<T>
where
    T: Pod,
{
    /// Views the contents of the buffer as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Views the contents of the buffer as mutable raw bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        bytemuck::cast_slice_mut(&mut self.data)
    }
}

impl<T> Default for FixedBuffer<T> {
    fn default() -> Self {
        FixedBuffer {
            data: Box::default(),
        }
    }
}

impl<T> Deref for FixedBuffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}

impl<T> DerefMut for FixedBuffer<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T> Index<usize> for FixedBuffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

impl<T> IndexMut<usize> for FixedBuffer<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.data[index]
    }
}

impl<T> From<Vec<T>> for FixedBuffer<T> {
    fn from(vec: Vec<T>) -> Self {
        FixedBuffer {
            data: vec.into_boxed_slice(),
        }
    }
}

impl<T> From<Box<[T]>> for FixedBuffer<T> {
    fn from(data: Box<[T]>) -> Self {
        FixedBuffer { data }
    }
}

impl<T> From<FixedBuffer<T>> for Vec<T> {
    fn from(buffer: FixedBuffer<T>) -> Self {
        buffer.into_vec()
    }
}

impl<T> IntoIterator for FixedBuffer<T> {
    type Item = T;

    type IntoIter = vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}

impl<'a, T> IntoIterator for &'a FixedBuffer<T> {
    type Item = &'a T;

    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut FixedBuffer<T> {
    type Item = &'a mut T;

    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter_mut()
    }
}

/// Error returned by [FixedBuffer::at] and [FixedBuffer::at_mut] for an index past the end of the
/// buffer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "index {} out of range for buffer of length {}", index, len)]
pub struct OutOfRange {
    pub index: usize,
    pub len: usize,
}

/// Error returned when two spans that must have equal lengths do not.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Fail)]
#[fail(display = "expected {} elements, got {}", expected, actual)]
pub struct SizeMismatch {
    pub expected: usize,
    pub actual: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filled() {
        for &len in &[0, 1, 7, 1000] {
            let buffer = FixedBuffer::filled(len, 3u16);

            assert_eq!(buffer.len(), len);
            assert!(buffer.iter().all(|v| *v == 3));
        }
    }

    #[test]
    fn test_new_is_default_initialized() {
        let buffer: FixedBuffer<i64> = FixedBuffer::new(5);

        assert_eq!(buffer.as_slice(), &[0, 0, 0, 0, 0]);

        let empty: FixedBuffer<String> = FixedBuffer::new(0);

        assert!(empty.is_empty());
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_clone_is_independent() {
        let original = FixedBuffer::from(vec![1, 2, 3]);
        let mut copy = original.clone();

        copy[0] = 10;
        copy.fill(9);

        assert_eq!(original.as_slice(), &[1, 2, 3]);
        assert_eq!(copy.as_slice(), &[9, 9, 9]);
    }

    #[test]
    fn test_at() {
        let mut buffer = FixedBuffer::from(vec!['a', 'b', 'c']);

        assert_eq!(buffer.at(0), Ok(&'a'));
        assert_eq!(buffer.at(2), Ok(&'c'));
        assert_eq!(buffer.at(3), Err(OutOfRange { index: 3, len: 3 }));
        assert_eq!(buffer.at(100), Err(OutOfRange { index: 100, len: 3 }));

        *buffer.at_mut(1).unwrap() = 'z';

        assert_eq!(buffer.as_slice(), &['a', 'z', 'c']);
        assert_eq!(buffer.at_mut(3), Err(OutOfRange { index: 3, len: 3 }));

        let empty: FixedBuffer<u8> = FixedBuffer::new(0);

        assert_eq!(empty.at(0), Err(OutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn test_out_of_range_display() {
        let error = OutOfRange { index: 4, len: 2 };

        assert_eq!(
            error.to_string(),
            "index 4 out of range for buffer of length 2"
        );
    }

    #[test]
    fn test_get_unchecked() {
        let buffer = FixedBuffer::from(vec![5, 6]);

        unsafe {
            assert_eq!(*buffer.get_unchecked(1), 6);
        }
    }

    #[test]
    fn test_take_leaves_source_empty() {
        let mut source = FixedBuffer::filled(3, 1.5f32);
        let target = source.take();

        assert_eq!(target.len(), 3);
        assert_eq!(source.len(), 0);
        assert!(source.is_empty());
    }

    #[test]
    fn test_copy_from() {
        let mut target = FixedBuffer::filled(3, 0u8);

        target.copy_from(&FixedBuffer::from(vec![1, 2, 3])).unwrap();

        assert_eq!(target.as_slice(), &[1, 2, 3]);

        let result = target.copy_from(&FixedBuffer::filled(4, 7));

        assert_eq!(
            result,
            Err(SizeMismatch {
                expected: 3,
                actual: 4
            })
        );
        assert_eq!(target.as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn test_fill_parallel_matches_fill() {
        let len = PARALLEL_FILL_THRESHOLD * 3 + 17;
        let mut parallel = FixedBuffer::filled(len, 0u32);
        let mut sequential = FixedBuffer::filled(len, 0u32);

        parallel.fill_parallel(&0xdead);
        sequential.fill(0xdead);

        assert_eq!(parallel, sequential);

        let mut small = FixedBuffer::filled(10, 0u32);

        small.fill_parallel(&4);

        assert!(small.iter().all(|v| *v == 4));
    }

    #[test]
    fn test_as_bytes() {
        let mut buffer = FixedBuffer::from(vec![1u16, 0x0203]);

        assert_eq!(buffer.as_bytes().len(), 4);
        assert_eq!(buffer.as_bytes()[0..2], 1u16.to_ne_bytes());

        buffer.as_bytes_mut().copy_from_slice(&[0; 4]);

        assert_eq!(buffer.as_slice(), &[0, 0]);
    }

    #[test]
    fn test_zeroed() {
        let buffer: FixedBuffer<[f32; 2]> = FixedBuffer::zeroed(3);

        assert_eq!(buffer.as_slice(), &[[0.0; 2]; 3]);
    }

    #[test]
    fn test_iterators() {
        let mut buffer = FixedBuffer::from(vec![1, 2, 3]);

        for value in &mut buffer {
            *value *= 2;
        }

        let sum: i32 = (&buffer).into_iter().sum();

        assert_eq!(sum, 12);
        assert_eq!(buffer.into_iter().collect::<Vec<_>>(), vec![2, 4, 6]);
    }
}
