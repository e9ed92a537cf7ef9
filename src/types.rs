use std::cell::RefCell;
use std::rc::Rc;

pub type Shared<T> = Rc<RefCell<T>>;

pub fn create_shared<T>(val: T) -> Shared<T> {
    Rc::new(RefCell::new(val))
}

/// Test sink: a writer the test keeps a handle to after handing the
/// interpreter its boxed clone.
#[cfg(test)]
pub(crate) struct SharedSink(pub(crate) Shared<Vec<u8>>);

#[cfg(test)]
impl std::io::Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
