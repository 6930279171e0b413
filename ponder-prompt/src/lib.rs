mod react;
mod template;

pub use react::REACT_TEMPLATE;
pub use template::PromptTemplate;
