/// Form session controller
pub mod form_session;
