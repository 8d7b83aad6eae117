//! Raw bulk endpoint access

use std::{fmt, io, time::Duration};

/// Bulk OUT/IN endpoint pair of a claimed USB interface
pub trait BulkEndpoint: fmt::Debug + Send {
    /// Write `data` to the OUT endpoint
    fn write(&mut self, data: &[u8], timeout: Duration) -> io::Result<usize>;

    /// Read from the IN endpoint into `buf`, returning the byte count
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;
}

impl<T: BulkEndpoint + ?Sized> BulkEndpoint for Box<T> {
    fn write(&mut self, data: &[u8], timeout: Duration) -> io::Result<usize> {
        (**self).write(data, timeout)
    }

    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        (**self).read(buf, timeout)
    }
}
