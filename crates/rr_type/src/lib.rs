use core::marker::PhantomData;
use std::hash::{Hash, Hasher};

pub mod file;
pub mod span;
pub mod symbol;
pub mod types;
pub mod value;

/// Typed index into a [`Store`].
///
/// The phantom is `fn() -> T` so ids stay `Send + Sync` regardless of `T`;
/// compilation units move their arenas across worker threads.
#[repr(transparent)]
pub struct Id<T>(u32, PhantomData<fn() -> T>);

impl<T> Id<T> {
  pub const fn new(index: u32) -> Self {
    Self(index, PhantomData)
  }

  #[inline]
  pub const fn index(&self) -> u32 {
    self.0
  }
}

impl<T> Clone for Id<T> {
  fn clone(&self) -> Self {
    *self
  }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    self.0 == other.0
  }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl<T> Ord for Id<T> {
  fn cmp(
    &self,
    other: &Self,
  ) -> std::cmp::Ordering {
    self.0.cmp(&other.0)
  }
}

impl<T> Hash for Id<T> {
  fn hash<H: Hasher>(
    &self,
    state: &mut H,
  ) {
    self.0.hash(state);
  }
}

impl<T> Default for Id<T> {
  fn default() -> Self {
    Self::new(0)
  }
}

impl<T> std::fmt::Debug for Id<T> {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "#{}", self.0)
  }
}

impl<T> serde::Serialize for Id<T> {
  fn serialize<S: serde::Serializer>(
    &self,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    serializer.serialize_u32(self.0)
  }
}

#[derive(Default, Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct BytePosition(pub u32);

impl std::fmt::Display for BytePosition {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Append-only arena. Cross references are `Id<T>` indices, never pointers.
#[derive(Debug, Clone)]
pub struct Store<T> {
  data: Vec<T>,
}

impl<T> Default for Store<T> {
  fn default() -> Self {
    Self::new()
  }
}

impl<T> Store<T> {
  pub fn new() -> Self {
    Self { data: Vec::new() }
  }

  pub fn alloc(
    &mut self,
    v: T,
  ) -> Id<T> {
    let id = Id::new(self.data.len() as u32);
    self.data.push(v);
    id
  }

  pub fn get(
    &self,
    id: &Id<T>,
  ) -> &T {
    &self.data[id.0 as usize]
  }

  pub fn get_mut(
    &mut self,
    id: &Id<T>,
  ) -> &mut T {
    &mut self.data[id.0 as usize]
  }

  pub fn try_get(
    &self,
    id: &Id<T>,
  ) -> Option<&T> {
    self.data.get(id.0 as usize)
  }

  pub fn contains(
    &self,
    id: &Id<T>,
  ) -> bool {
    (id.0 as usize) < self.data.len()
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  pub fn get_all(&self) -> &[T] {
    &self.data
  }

  /// Ids in allocation order.
  pub fn ids(&self) -> impl Iterator<Item = Id<T>> + '_ {
    (0..self.data.len() as u32).map(Id::new)
  }

  pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
    self.data.iter().enumerate().map(|(idx, v)| (Id::new(idx as u32), v))
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = (Id<T>, &mut T)> {
    self.data.iter_mut().enumerate().map(|(idx, v)| (Id::new(idx as u32), v))
  }
}

impl<T> IntoIterator for Store<T> {
  type Item = T;
  type IntoIter = std::vec::IntoIter<T>;

  fn into_iter(self) -> Self::IntoIter {
    self.data.into_iter()
  }
}
