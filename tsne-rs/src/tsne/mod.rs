pub mod constants;
pub mod init_solution;
pub mod joint_probabilities;
pub mod kl_gradient;
pub mod perplexity_search;
pub mod raise_convergence_warning;
pub mod student_t;
