//! Fixed-capacity numeric buffers.
//!
//! GPU-facing data (vertex positions, indices, texel bytes) lives in
//! dedicated buffer types rather than plain slices so the generic value
//! codec can distinguish a float *buffer* from a float *array* at runtime.
//! A buffer read back from a document holds exactly its declared size and
//! is ready to consume from position zero; writing never disturbs the
//! caller's buffer.

/// A fixed-capacity buffer of numeric elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer<T> {
    data: Vec<T>,
}

/// Buffer of `f32` elements (vertex data, normals, texture coordinates).
pub type FloatBuffer = Buffer<f32>;
/// Buffer of `i32` elements (index data).
pub type IntBuffer = Buffer<i32>;
/// Buffer of raw bytes (texel data).
pub type ByteBuffer = Buffer<u8>;
/// Buffer of `i16` elements (compact index data).
pub type ShortBuffer = Buffer<i16>;

impl<T> Buffer<T> {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Wrap an existing vector.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Logical size (the buffer's limit).
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow the contents.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consume the buffer, returning its contents.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Buffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self::from_vec(data)
    }
}

impl<T> std::ops::Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.data
    }
}
