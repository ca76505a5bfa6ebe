pub(crate) mod trip;

#[cfg(test)]
pub(crate) mod tests;
